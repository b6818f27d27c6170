//! Formula tokenizer
//!
//! Characters outside the formula alphabet are skipped,
//! so tokenizing never fails. Anything malformed surfaces in the parser.

use std::fmt;

/// Kind of a formula token
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    /// Identifier or dotted path such as `player.x`
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

/// A token and the byte offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: usize,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::Ident(name) => write!(f, "{name}"),
            TokenKind::Op(op) => write!(f, "{op}"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
        }
    }
}

const OPERATORS: [char; 6] = ['+', '-', '*', '/', '%', '^'];

#[inline]
fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Split a formula into tokens
pub fn tokenize(source: &str) -> Vec<Token> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos] as char;

        if c.is_ascii_digit() {
            let start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            // Fraction only when a digit follows the dot
            if pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
                pos += 1;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            // ASCII digits and a dot always parse
            let value = source[start..pos].parse::<f64>().unwrap_or(0.0);
            tokens.push(Token {
                kind: TokenKind::Number(value),
                pos: start,
            });
            continue;
        }

        if is_ident_start(c) {
            let start = pos;
            while pos < bytes.len() && is_ident_continue(bytes[pos] as char) {
                pos += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident(source[start..pos].to_string()),
                pos: start,
            });
            continue;
        }

        let kind = match c {
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            ',' => Some(TokenKind::Comma),
            _ if OPERATORS.contains(&c) => Some(TokenKind::Op(c)),
            _ => None,
        };
        if let Some(kind) = kind {
            tokens.push(Token { kind, pos });
        }

        // Skip whitespace and unknown characters alike, one UTF-8 char at a time
        pos += source[pos..].chars().next().map_or(1, char::len_utf8);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_numbers_and_operators() {
        assert_eq!(
            kinds("2+3.25*4"),
            vec![
                TokenKind::Number(2.0),
                TokenKind::Op('+'),
                TokenKind::Number(3.25),
                TokenKind::Op('*'),
                TokenKind::Number(4.0),
            ]
        );
    }

    #[test]
    fn test_dotted_identifier_is_one_token() {
        assert_eq!(
            kinds("player.x + enemy_2.y"),
            vec![
                TokenKind::Ident("player.x".into()),
                TokenKind::Op('+'),
                TokenKind::Ident("enemy_2.y".into()),
            ]
        );
    }

    #[test]
    fn test_call_punctuation() {
        assert_eq!(
            kinds("min(a, 1)"),
            vec![
                TokenKind::Ident("min".into()),
                TokenKind::LParen,
                TokenKind::Ident("a".into()),
                TokenKind::Comma,
                TokenKind::Number(1.0),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_unknown_characters_are_skipped() {
        assert_eq!(
            kinds("1 $ # 2 é"),
            vec![TokenKind::Number(1.0), TokenKind::Number(2.0)]
        );
    }

    #[test]
    fn test_no_exponent_notation() {
        // "1e5" is the number 1 followed by the identifier "e5"
        assert_eq!(
            kinds("1e5"),
            vec![TokenKind::Number(1.0), TokenKind::Ident("e5".into())]
        );
    }

    #[test]
    fn test_trailing_dot_is_not_fraction() {
        assert_eq!(kinds("3."), vec![TokenKind::Number(3.0)]);
    }

    #[test]
    fn test_positions() {
        let tokens = tokenize("  a *b");
        assert_eq!(tokens[0].pos, 2);
        assert_eq!(tokens[1].pos, 4);
        assert_eq!(tokens[2].pos, 5);
    }
}
