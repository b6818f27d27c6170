//! Spell formula language
//!
//! Source text goes through `lexer` -> `parser` -> `compiler` and comes out
//! as an [`Evaluator`], a sandboxed `Env -> f64` function:
//! - expression-only, no loops or state between evaluations
//! - unknown variables read as 0, division by zero yields 0
//! - every function comes from an injected [`Registry`]

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod env;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod validate;

pub use ast::{BinOp, Node};
pub use builtins::{BuiltinFn, Purity, Registry};
pub use compiler::{Evaluator, compile, compile_source};
pub use env::{Env, Var};
pub use error::{CompileError, EvalError, EvalResult, ParseError};
pub use lexer::{Token, TokenKind, tokenize};
pub use parser::{MAX_DEPTH, MAX_SOURCE_LEN, parse, parse_source};
pub use validate::{dummy_env, validate, validate_with};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NAMES: [&str; 6] = ["t", "i", "player.x", "enemy.y", "aim", "unset_name"];
    const FUNCS: [&str; 6] = ["sin", "cos", "abs", "min", "max", "clamp"];

    fn arb_node() -> impl Strategy<Value = Node> {
        let leaf = prop_oneof![
            // The parser never yields negative literals, only Negate nodes
            (0.0f64..1000.0).prop_map(Node::number),
            (0usize..NAMES.len()).prop_map(|i| Node::var(NAMES[i])),
        ];
        leaf.prop_recursive(5, 48, 3, |inner| {
            prop_oneof![
                inner.clone().prop_map(Node::negate),
                (0usize..6, inner.clone(), inner.clone()).prop_map(|(op, l, r)| {
                    let op = [BinOp::Add, BinOp::Sub, BinOp::Mul, BinOp::Div, BinOp::Rem, BinOp::Pow][op];
                    Node::binary(op, l, r)
                }),
                (0usize..FUNCS.len(), prop::collection::vec(inner, 0..3))
                    .prop_map(|(f, args)| Node::call(FUNCS[f], args)),
            ]
        })
    }

    fn close(a: f64, b: f64) -> bool {
        if a.is_nan() || b.is_nan() {
            return a.is_nan() && b.is_nan();
        }
        if a.is_infinite() || b.is_infinite() {
            return a == b;
        }
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    proptest! {
        #[test]
        fn printed_tree_reparses_to_same_tree(node in arb_node()) {
            let printed = node.to_string();
            let reparsed = parse_source(&printed);
            prop_assert_eq!(reparsed, Ok(node), "printed as {}", printed);
        }

        #[test]
        fn printed_tree_compiles_to_same_value(
            node in arb_node(),
            t in -10.0f64..10.0,
            px in -500.0f64..500.0,
        ) {
            let registry = Registry::standard();
            let env = Env::new(1).with(Var::T, t).with(Var::PlayerX, px).with(Var::I, 2.0);
            let direct = node.eval(&env, &registry);
            let compiled = compile_source(&node.to_string(), &registry).expect("compiles");
            match compiled.eval(&env) {
                Ok(v) => prop_assert!(close(v, direct), "{} vs {}", v, direct),
                Err(EvalError::NonFinite { .. }) => prop_assert!(!direct.is_finite()),
                Err(e) => prop_assert!(false, "unexpected {}", e),
            }
        }

        #[test]
        fn tokenizer_and_parser_never_panic(source in "\\PC{0,64}") {
            let _ = parse_source(&source);
        }

        #[test]
        fn validate_never_panics(source in "[-+*/%^(),.a-z0-9 ]{0,48}") {
            let _ = validate(&source);
        }
    }
}
