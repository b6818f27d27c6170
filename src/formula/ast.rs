//! Formula syntax tree
//!
//! Trees come from two places: the parser, and the visual spell editor,
//! which builds them with the constructors below and ships them as source
//! text through the [`fmt::Display`] printer.

use std::fmt;

use super::builtins::Registry;
use super::env::Env;

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl BinOp {
    pub fn symbol(self) -> char {
        match self {
            BinOp::Add => '+',
            BinOp::Sub => '-',
            BinOp::Mul => '*',
            BinOp::Div => '/',
            BinOp::Rem => '%',
            BinOp::Pow => '^',
        }
    }

    pub fn from_symbol(c: char) -> Option<BinOp> {
        match c {
            '+' => Some(BinOp::Add),
            '-' => Some(BinOp::Sub),
            '*' => Some(BinOp::Mul),
            '/' => Some(BinOp::Div),
            '%' => Some(BinOp::Rem),
            '^' => Some(BinOp::Pow),
            _ => None,
        }
    }

    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 2,
            BinOp::Pow => 3,
        }
    }

    /// Apply the operator. Division and remainder by zero yield 0.
    #[inline]
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinOp::Add => lhs + rhs,
            BinOp::Sub => lhs - rhs,
            BinOp::Mul => lhs * rhs,
            BinOp::Div => {
                if rhs == 0.0 {
                    0.0
                } else {
                    lhs / rhs
                }
            }
            BinOp::Rem => {
                if rhs == 0.0 {
                    0.0
                } else {
                    lhs % rhs
                }
            }
            BinOp::Pow => lhs.powf(rhs),
        }
    }
}

/// A formula expression
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(f64),
    Variable(String),
    Negate(Box<Node>),
    Binary {
        op: BinOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Call {
        name: String,
        args: Vec<Node>,
    },
}

impl Node {
    pub fn number(value: f64) -> Self {
        Node::Number(value)
    }

    pub fn var(name: impl Into<String>) -> Self {
        Node::Variable(name.into())
    }

    pub fn negate(child: Node) -> Self {
        Node::Negate(Box::new(child))
    }

    pub fn binary(op: BinOp, lhs: Node, rhs: Node) -> Self {
        Node::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Node>) -> Self {
        Node::Call {
            name: name.into(),
            args,
        }
    }

    /// Nesting depth, a leaf counts as 1
    ///
    /// Walks with an explicit stack, so any tree that fits in memory can be
    /// measured.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            match node {
                Node::Number(_) | Node::Variable(_) => {}
                Node::Negate(child) => stack.push((child.as_ref(), depth + 1)),
                Node::Binary { lhs, rhs, .. } => {
                    stack.push((lhs.as_ref(), depth + 1));
                    stack.push((rhs.as_ref(), depth + 1));
                }
                Node::Call { args, .. } => stack.extend(args.iter().map(|a| (a, depth + 1))),
            }
        }
        deepest
    }

    /// Evaluate the tree directly, without compiling
    ///
    /// Slow path with the same semantics as a compiled evaluator; unknown
    /// functions read as 0 here rather than failing.
    pub fn eval(&self, env: &Env, registry: &Registry) -> f64 {
        match self {
            Node::Number(v) => *v,
            Node::Variable(name) => env.lookup(name),
            Node::Negate(child) => -child.eval(env, registry),
            Node::Binary { op, lhs, rhs } => {
                op.apply(lhs.eval(env, registry), rhs.eval(env, registry))
            }
            Node::Call { name, args } => {
                let values: Vec<f64> = args.iter().map(|a| a.eval(env, registry)).collect();
                registry
                    .get(name)
                    .and_then(|b| b.invoke(&values, env).ok())
                    .unwrap_or(0.0)
            }
        }
    }

    /// True for nodes the printer can emit without parentheses in any position
    fn is_atom(&self) -> bool {
        match self {
            Node::Number(v) => v.is_sign_positive(),
            Node::Variable(_) | Node::Call { .. } => true,
            Node::Negate(_) | Node::Binary { .. } => false,
        }
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    // The grammar has no literal for these; division by zero reads as 0 so
    // non-finite constants print as the closest thing the language can say.
    if value.is_nan() {
        write!(f, "0")
    } else if value.is_infinite() {
        write!(f, "{}", if value > 0.0 { f64::MAX } else { f64::MIN })
    } else {
        // f64 Display never uses exponent notation and round-trips exactly
        write!(f, "{value}")
    }
}

/// Write a binary operand, parenthesized when the parser would otherwise
/// regroup it. Chains are left-associative, so a right operand of equal
/// precedence needs parentheses and a left one does not.
fn write_operand(f: &mut fmt::Formatter<'_>, node: &Node, parent: BinOp, right: bool) -> fmt::Result {
    let wrap = match node {
        Node::Binary { op, .. } => {
            op.precedence() < parent.precedence()
                || (right && op.precedence() == parent.precedence())
        }
        // Unary binds tighter than any binary operator
        _ => false,
    };
    if wrap {
        write!(f, "({node})")
    } else {
        write!(f, "{node}")
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Number(v) => write_number(f, *v),
            Node::Variable(name) => write!(f, "{name}"),
            Node::Negate(child) => {
                if child.is_atom() {
                    write!(f, "-{child}")
                } else {
                    write!(f, "-({child})")
                }
            }
            Node::Binary { op, lhs, rhs } => {
                write_operand(f, lhs, *op, false)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, rhs, *op, true)
            }
            Node::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_division() {
        assert_eq!(BinOp::Div.apply(5.0, 0.0), 0.0);
        assert_eq!(BinOp::Rem.apply(5.0, 0.0), 0.0);
        assert_eq!(BinOp::Rem.apply(7.0, 4.0), 3.0);
        assert_eq!(BinOp::Pow.apply(2.0, 10.0), 1024.0);
    }

    #[test]
    fn test_printer_minimal_parens() {
        let sum = Node::binary(BinOp::Add, Node::number(2.0), Node::var("a"));
        let product = Node::binary(BinOp::Mul, sum.clone(), Node::number(3.0));
        assert_eq!(product.to_string(), "(2 + a) * 3");

        let right_nested = Node::binary(BinOp::Sub, Node::number(1.0), sum);
        assert_eq!(right_nested.to_string(), "1 - (2 + a)");

        let left_chain = Node::binary(
            BinOp::Pow,
            Node::binary(BinOp::Pow, Node::number(2.0), Node::number(3.0)),
            Node::number(2.0),
        );
        assert_eq!(left_chain.to_string(), "2 ^ 3 ^ 2");
    }

    #[test]
    fn test_printer_negation() {
        assert_eq!(Node::negate(Node::var("t")).to_string(), "-t");
        assert_eq!(Node::negate(Node::number(-2.0)).to_string(), "-(-2)");
        assert_eq!(
            Node::negate(Node::negate(Node::var("t"))).to_string(),
            "-(-t)"
        );
        let call = Node::call("max", vec![Node::number(1.5), Node::negate(Node::var("i"))]);
        assert_eq!(call.to_string(), "max(1.5, -i)");
    }

    #[test]
    fn test_depth() {
        let tree = Node::negate(Node::binary(BinOp::Add, Node::number(1.0), Node::var("x")));
        assert_eq!(tree.depth(), 3);
        assert_eq!(Node::call("rand", vec![]).depth(), 1);
    }
}
