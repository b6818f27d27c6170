//! Recursive-descent formula parser
//!
//! Grammar, lowest to highest precedence:
//!
//! ```text
//! expr  := term (('+' | '-') term)*
//! term  := power (('*' | '/' | '%') power)*
//! power := unary ('^' unary)*            left-associative
//! unary := ('+' | '-')? atom
//! atom  := number | ident | ident '(' (expr (',' expr)*)? ')' | '(' expr ')'
//! ```

use super::ast::{BinOp, Node};
use super::error::ParseError;
use super::lexer::{Token, TokenKind, tokenize};

/// Longest accepted formula source, in bytes
pub const MAX_SOURCE_LEN: usize = 4096;
/// Deepest accepted nesting of unary, binary, call and parenthesis levels
pub const MAX_DEPTH: usize = 64;

/// Tokenize and parse a formula
pub fn parse_source(source: &str) -> Result<Node, ParseError> {
    if source.len() > MAX_SOURCE_LEN {
        return Err(ParseError::TooLong {
            len: source.len(),
            limit: MAX_SOURCE_LEN,
        });
    }
    parse(&tokenize(source))
}

/// Parse a complete token stream into a single expression
pub fn parse(tokens: &[Token]) -> Result<Node, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let node = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(ParseError::TrailingInput {
            found: token.kind.to_string(),
            pos: token.pos,
        });
    }
    Ok(node)
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    #[inline]
    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    #[inline]
    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consume the next token if it is one of `ops`
    fn eat_op(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Op(c),
                ..
            }) if ops.contains(c) => {
                self.pos += 1;
                Some(*c)
            }
            _ => None,
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| &t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(ParseError::TooDeep { limit: MAX_DEPTH })
        } else {
            Ok(())
        }
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Parse one left-associative precedence level
    fn chain(
        &mut self,
        ops: &[char],
        operand: fn(&mut Self) -> Result<Node, ParseError>,
    ) -> Result<Node, ParseError> {
        let mut lhs = operand(self)?;
        let mut levels = 0;
        while let Some(c) = self.eat_op(ops) {
            // Each fold adds a level to the tree
            self.enter()?;
            levels += 1;
            let rhs = operand(self)?;
            let op = BinOp::from_symbol(c).unwrap_or(BinOp::Add);
            lhs = Node::binary(op, lhs, rhs);
        }
        for _ in 0..levels {
            self.leave();
        }
        Ok(lhs)
    }

    fn expr(&mut self) -> Result<Node, ParseError> {
        self.chain(&['+', '-'], Self::term)
    }

    fn term(&mut self) -> Result<Node, ParseError> {
        self.chain(&['*', '/', '%'], Self::power)
    }

    fn power(&mut self) -> Result<Node, ParseError> {
        self.chain(&['^'], Self::unary)
    }

    fn unary(&mut self) -> Result<Node, ParseError> {
        match self.eat_op(&['+', '-']) {
            Some('-') => {
                self.enter()?;
                let node = Node::negate(self.atom()?);
                self.leave();
                Ok(node)
            }
            _ => self.atom(),
        }
    }

    fn atom(&mut self) -> Result<Node, ParseError> {
        let token = self.next().ok_or(ParseError::UnexpectedEnd {
            expected: "a number, name or '('",
        })?;

        match &token.kind {
            TokenKind::Number(v) => Ok(Node::Number(*v)),
            TokenKind::Ident(name) => {
                if self.eat(&TokenKind::LParen) {
                    self.enter()?;
                    let args = self.call_args()?;
                    self.leave();
                    Ok(Node::call(name.clone(), args))
                } else {
                    Ok(Node::var(name.clone()))
                }
            }
            TokenKind::LParen => {
                self.enter()?;
                let inner = self.expr()?;
                self.expect_rparen()?;
                self.leave();
                Ok(inner)
            }
            other => Err(ParseError::UnexpectedToken {
                found: other.to_string(),
                pos: token.pos,
            }),
        }
    }

    /// Arguments after an opening parenthesis, through the closing one
    fn call_args(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect_rparen()?;
            return Ok(args);
        }
    }

    fn expect_rparen(&mut self) -> Result<(), ParseError> {
        match self.next() {
            Some(Token {
                kind: TokenKind::RParen,
                ..
            }) => Ok(()),
            Some(token) => Err(ParseError::UnexpectedToken {
                found: token.kind.to_string(),
                pos: token.pos,
            }),
            None => Err(ParseError::UnexpectedEnd { expected: "')'" }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(source: &str) -> Node {
        parse_source(source).expect("should parse")
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            p("2+3*4"),
            Node::binary(
                BinOp::Add,
                Node::number(2.0),
                Node::binary(BinOp::Mul, Node::number(3.0), Node::number(4.0)),
            )
        );
        assert_eq!(
            p("2*3^2"),
            Node::binary(
                BinOp::Mul,
                Node::number(2.0),
                Node::binary(BinOp::Pow, Node::number(3.0), Node::number(2.0)),
            )
        );
    }

    #[test]
    fn test_power_chain_is_left_associative() {
        assert_eq!(
            p("2^3^2"),
            Node::binary(
                BinOp::Pow,
                Node::binary(BinOp::Pow, Node::number(2.0), Node::number(3.0)),
                Node::number(2.0),
            )
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(p("-x"), Node::negate(Node::var("x")));
        assert_eq!(p("+x"), Node::var("x"));
        assert_eq!(
            p("-cos(t)"),
            Node::negate(Node::call("cos", vec![Node::var("t")]))
        );
        // Unary binds tighter than '^'
        assert_eq!(
            p("-2^2"),
            Node::binary(BinOp::Pow, Node::negate(Node::number(2.0)), Node::number(2.0))
        );
        assert_eq!(
            p("3 - -1"),
            Node::binary(BinOp::Sub, Node::number(3.0), Node::negate(Node::number(1.0)))
        );
    }

    #[test]
    fn test_calls() {
        assert_eq!(p("rand()"), Node::call("rand", vec![]));
        assert_eq!(
            p("clamp(t, 0, 1)"),
            Node::call(
                "clamp",
                vec![Node::var("t"), Node::number(0.0), Node::number(1.0)]
            )
        );
        assert_eq!(
            p("max(min(a, b), (c))"),
            Node::call(
                "max",
                vec![
                    Node::call("min", vec![Node::var("a"), Node::var("b")]),
                    Node::var("c"),
                ]
            )
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_source(""), Err(ParseError::Empty));
        assert_eq!(parse_source("  $ "), Err(ParseError::Empty));
        assert!(matches!(
            parse_source("1 +"),
            Err(ParseError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            parse_source("(1 + 2"),
            Err(ParseError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            parse_source("1 2"),
            Err(ParseError::TrailingInput { pos: 2, .. })
        ));
        assert!(matches!(
            parse_source("*3"),
            Err(ParseError::UnexpectedToken { pos: 0, .. })
        ));
        assert!(matches!(
            parse_source("--3"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse_source("f(1,)"),
            Err(ParseError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_depth_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(
            parse_source(&deep),
            Err(ParseError::TooDeep { limit: MAX_DEPTH })
        );
        let ok = format!("{}1{}", "(".repeat(MAX_DEPTH - 1), ")".repeat(MAX_DEPTH - 1));
        assert_eq!(parse_source(&ok), Ok(Node::number(1.0)));
    }

    #[test]
    fn test_long_chains_count_toward_depth() {
        let chain = vec!["1"; MAX_DEPTH + 2].join("+");
        assert_eq!(
            parse_source(&chain),
            Err(ParseError::TooDeep { limit: MAX_DEPTH })
        );
    }

    #[test]
    fn test_length_limit() {
        let long = "1+".repeat(MAX_SOURCE_LEN) + "1";
        assert!(matches!(
            parse_source(&long),
            Err(ParseError::TooLong { .. })
        ));
    }
}
