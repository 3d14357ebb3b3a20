//! Expression tree.

use std::fmt;

use srvwatch_types::VariableRef;

use crate::context::Context;
use crate::error::EvalError;

/// Arithmetic operator of a [`Node::Binary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOperator {
    /// Map an operator character to its operator.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(BinaryOperator::Add),
            '-' => Some(BinaryOperator::Sub),
            '*' => Some(BinaryOperator::Mul),
            '/' => Some(BinaryOperator::Div),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            BinaryOperator::Add => '+',
            BinaryOperator::Sub => '-',
            BinaryOperator::Mul => '*',
            BinaryOperator::Div => '/',
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Add | BinaryOperator::Sub => 1,
            BinaryOperator::Mul | BinaryOperator::Div => 2,
        }
    }

    /// Apply with IEEE-754 semantics. Division by zero yields an infinity or NaN.
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOperator::Add => lhs + rhs,
            BinaryOperator::Sub => lhs - rhs,
            BinaryOperator::Mul => lhs * rhs,
            BinaryOperator::Div => lhs / rhs,
        }
    }
}

/// A node of a parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Numeric literal.
    Number(f64),
    /// Reference to a monitor variable.
    Variable(VariableRef),
    /// Left-associative binary operation.
    Binary {
        op: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub(crate) fn binary(op: BinaryOperator, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Evaluate the subtree against a resolved context.
    pub fn evaluate(&self, ctx: &Context) -> Result<f64, EvalError> {
        match self {
            Node::Number(n) => Ok(*n),
            Node::Variable(var) => ctx.get(var).ok_or_else(|| EvalError::VariableNotFound {
                variable: var.to_string(),
            }),
            Node::Binary { op, left, right } => {
                let lhs = left.evaluate(ctx)?;
                let rhs = right.evaluate(ctx)?;
                Ok(op.apply(lhs, rhs))
            }
        }
    }

    /// Append every variable reference in the subtree, left to right.
    pub fn collect_variables<'a>(&'a self, out: &mut Vec<&'a VariableRef>) {
        match self {
            Node::Number(_) => {}
            Node::Variable(var) => out.push(var),
            Node::Binary { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
        }
    }

    fn fmt_operand(
        &self,
        f: &mut fmt::Formatter<'_>,
        parent: BinaryOperator,
        is_right: bool,
    ) -> fmt::Result {
        let needs_parens = match self {
            Node::Binary { op, .. } => {
                op.precedence() < parent.precedence()
                    || (is_right && op.precedence() == parent.precedence())
            }
            // "2 - -3" would not parse back
            Node::Number(n) => n.is_sign_negative(),
            Node::Variable(_) => false,
        };
        if needs_parens {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Number(n) => write!(f, "{}", n),
            Node::Variable(var) => write!(f, "{}", var),
            Node::Binary { op, left, right } => {
                left.fmt_operand(f, *op, false)?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_operand(f, *op, true)
            }
        }
    }
}
