//! Arithmetic expressions over monitor variables.
//!
//! An [`Expression`] is parsed once and is immutable afterwards. Evaluation
//! is synchronous and only reads the supplied [`Context`], so the same
//! expression can be evaluated concurrently against different contexts.
//!
//! ```rust
//! use srvwatch_core::{Context, Expression};
//!
//! let expr = Expression::parse("(mem.MemTotal - mem.MemFree) / 1024").unwrap();
//! let ctx: Context = [("mem.MemTotal", 4096.0), ("mem.MemFree", 1024.0)]
//!     .into_iter()
//!     .collect();
//! assert_eq!(expr.evaluate(&ctx), Ok(3.0));
//! ```

mod ast;
mod parser;

use std::fmt;
use std::str::FromStr;

use srvwatch_types::VariableRef;

pub use ast::{BinaryOperator, Node};
pub use parser::{MAX_DEPTH, MAX_OPERATORS};

use crate::context::Context;
use crate::error::{EvalError, ParseError};

/// A parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    root: Node,
}

impl Expression {
    /// Parse expression text.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let root = parser::parse(text)?;
        Ok(Self {
            source: text.to_string(),
            root,
        })
    }

    /// The text this expression was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Root node of the tree.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Every variable reference in the expression, left to right.
    ///
    /// A variable referenced twice appears twice.
    pub fn variables(&self) -> Vec<&VariableRef> {
        let mut vars = Vec::new();
        self.root.collect_variables(&mut vars);
        vars
    }

    /// Evaluate against a resolved context.
    pub fn evaluate(&self, ctx: &Context) -> Result<f64, EvalError> {
        self.root.evaluate(ctx)
    }
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}
