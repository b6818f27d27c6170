//! Lowering from syntax tree to evaluator closures
//!
//! Each node becomes a boxed closure over its children; constant subtrees
//! are folded at compile time. Variables resolve to [`Var`] slots here, so
//! evaluation never touches strings.

use std::fmt;
use std::sync::Arc;

use super::ast::Node;
use super::builtins::{BuiltinFn, Purity, Registry};
use super::env::{Env, Var};
use super::error::{CompileError, EvalError, EvalResult, ParseError};
use super::parser::{MAX_DEPTH, parse_source};

type Thunk = Box<dyn Fn(&Env) -> EvalResult + Send + Sync>;

/// Arguments up to this count are evaluated into a stack buffer
const INLINE_ARGS: usize = 8;

/// A compiled formula: `Env -> f64`, failing only on non-finite output
#[derive(Clone)]
pub struct Evaluator {
    source: Arc<str>,
    thunk: Arc<dyn Fn(&Env) -> EvalResult + Send + Sync>,
    constant: Option<f64>,
    random: bool,
}

impl Evaluator {
    /// An evaluator that always yields `value`
    pub fn constant(value: f64) -> Self {
        Self {
            source: Node::Number(value).to_string().into(),
            thunk: Arc::new(move |_| Ok(value)),
            constant: Some(value),
            random: false,
        }
    }

    /// Evaluate against `env`
    #[inline]
    pub fn eval(&self, env: &Env) -> EvalResult {
        let value = (self.thunk)(env)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvalError::NonFinite { value })
        }
    }

    /// Source text this evaluator was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Folded value, when the whole formula is constant
    pub fn as_constant(&self) -> Option<f64> {
        self.constant
    }

    /// Whether any random-drawing builtin is reachable from this formula
    pub fn draws_random(&self) -> bool {
        self.random
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("source", &self.source)
            .field("constant", &self.constant)
            .field("random", &self.random)
            .finish()
    }
}

enum Lowered {
    Const(f64),
    Dyn(Thunk),
}

impl Lowered {
    fn into_thunk(self) -> Thunk {
        match self {
            Lowered::Const(v) => Box::new(move |_| Ok(v)),
            Lowered::Dyn(thunk) => thunk,
        }
    }
}

struct Lowering<'r> {
    registry: &'r Registry,
    random: bool,
}

impl Lowering<'_> {
    fn lower(&mut self, node: &Node) -> Result<Lowered, CompileError> {
        match node {
            Node::Number(v) => Ok(Lowered::Const(*v)),
            Node::Variable(name) => Ok(match Var::from_name(name) {
                Some(var) => Lowered::Dyn(Box::new(move |env| Ok(env.get(var)))),
                None => Lowered::Const(0.0),
            }),
            Node::Negate(child) => Ok(match self.lower(child)? {
                Lowered::Const(v) => Lowered::Const(-v),
                Lowered::Dyn(c) => Lowered::Dyn(Box::new(move |env| Ok(-c(env)?))),
            }),
            Node::Binary { op, lhs, rhs } => {
                let op = *op;
                Ok(match (self.lower(lhs)?, self.lower(rhs)?) {
                    (Lowered::Const(a), Lowered::Const(b)) => Lowered::Const(op.apply(a, b)),
                    (l, r) => {
                        let (l, r) = (l.into_thunk(), r.into_thunk());
                        Lowered::Dyn(Box::new(move |env| Ok(op.apply(l(env)?, r(env)?))))
                    }
                })
            }
            Node::Call { name, args } => {
                let func = *self
                    .registry
                    .get(name)
                    .ok_or_else(|| CompileError::UnknownFunction { name: name.clone() })?;
                let lowered = args
                    .iter()
                    .map(|a| self.lower(a))
                    .collect::<Result<Vec<_>, _>>()?;

                if func.purity() == Purity::Random {
                    self.random = true;
                } else if let Some(values) = constant_args(&lowered) {
                    // Pure function of constants; the env is never read
                    if let BuiltinFn::Pure(f) = func {
                        return Ok(Lowered::Const(f(&values)));
                    }
                }

                let thunks: Vec<Thunk> = lowered.into_iter().map(Lowered::into_thunk).collect();
                Ok(Lowered::Dyn(Box::new(move |env| {
                    if thunks.len() <= INLINE_ARGS {
                        let mut buf = [0.0; INLINE_ARGS];
                        for (slot, arg) in buf.iter_mut().zip(&thunks) {
                            *slot = arg(env)?;
                        }
                        func.invoke(&buf[..thunks.len()], env)
                    } else {
                        let values = thunks
                            .iter()
                            .map(|arg| arg(env))
                            .collect::<Result<Vec<_>, _>>()?;
                        func.invoke(&values, env)
                    }
                })))
            }
        }
    }
}

fn constant_args(args: &[Lowered]) -> Option<Vec<f64>> {
    args.iter()
        .map(|a| match a {
            Lowered::Const(v) => Some(*v),
            Lowered::Dyn(_) => None,
        })
        .collect()
}

/// Lower a tree against `registry`
///
/// Fails if any called name is missing from the registry, so an unknown
/// function is caught before the formula is ever run. Trees built by hand
/// get the same nesting limit as parsed source: at most [`MAX_DEPTH`]
/// operator, negation or call levels above the leaves.
pub fn compile(node: &Node, registry: &Registry) -> Result<Evaluator, CompileError> {
    if node.depth() > MAX_DEPTH + 1 {
        return Err(ParseError::TooDeep { limit: MAX_DEPTH }.into());
    }
    compile_with_source(node, registry, node.to_string().into())
}

/// Lex, parse and lower formula source text
pub fn compile_source(source: &str, registry: &Registry) -> Result<Evaluator, CompileError> {
    let node = parse_source(source)?;
    compile_with_source(&node, registry, source.trim().into())
}

fn compile_with_source(
    node: &Node,
    registry: &Registry,
    source: Arc<str>,
) -> Result<Evaluator, CompileError> {
    let mut lowering = Lowering {
        registry,
        random: false,
    };
    let lowered = lowering.lower(node)?;
    let constant = match &lowered {
        Lowered::Const(v) => Some(*v),
        Lowered::Dyn(_) => None,
    };
    let thunk = lowered.into_thunk();
    Ok(Evaluator {
        source,
        thunk: Arc::from(thunk),
        constant,
        random: lowering.random,
    })
}
