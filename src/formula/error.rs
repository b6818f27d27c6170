//! Authoring-time and evaluation errors for spell formulas

use thiserror::Error;

/// Why a formula failed to parse
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("empty formula")]
    Empty,
    #[error("unexpected '{found}' at position {pos}")]
    UnexpectedToken { found: String, pos: usize },
    #[error("formula ends unexpectedly, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("unexpected trailing '{found}' at position {pos}")]
    TrailingInput { found: String, pos: usize },
    #[error("formula nests deeper than {limit} levels")]
    TooDeep { limit: usize },
    #[error("formula is {len} bytes long, limit is {limit}")]
    TooLong { len: usize, limit: usize },
}

/// Why a formula failed to compile
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },
}

/// Failure of a single evaluator invocation
///
/// The simulator treats any of these as "kill this particle", never as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum EvalError {
    #[error("formula produced a non-finite value ({value})")]
    NonFinite { value: f64 },
    #[error("random source already borrowed")]
    RandomSourceBusy,
}

pub type EvalResult = Result<f64, EvalError>;
