//! Error types for parsing, evaluation and monitor access.

use thiserror::Error;

/// Malformed expression text.
///
/// Positions are 0-based character offsets into the parsed text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A character that is not part of the expression language.
    #[error("unexpected character '{found}' at position {position}")]
    UnexpectedCharacter { found: char, position: usize },

    /// An operator where a number, variable or '(' was expected.
    #[error("unexpected operator '{operator}' at position {position}")]
    UnexpectedOperator { operator: char, position: usize },

    /// A '(' without its closing ')'.
    #[error("unmatched '(' at position {position}")]
    UnmatchedParenthesis { position: usize },

    /// A ')' with no group open.
    #[error("unexpected ')' at position {position}")]
    UnexpectedClosingParenthesis { position: usize },

    /// Input ended, or a group closed, where a factor was required.
    #[error("expected a number, variable or '(' at position {position}")]
    EmptyFactor { position: usize },

    /// A numeric literal that does not match `-?digits(.digits)?`.
    #[error("malformed number '{literal}' at position {position}")]
    InvalidNumber { literal: String, position: usize },

    /// An identifier that is not followed by `.variable`.
    #[error("malformed variable '{text}' at position {position}, expected monitor.variable")]
    InvalidVariable { text: String, position: usize },

    /// Input left over after a complete expression.
    #[error("unexpected '{found}' at position {position} after end of expression")]
    TrailingInput { found: char, position: usize },

    /// Parentheses nested deeper than [`MAX_DEPTH`](crate::expr::MAX_DEPTH).
    #[error("parentheses nested too deeply at position {position}")]
    TooDeep { position: usize },

    /// More binary operators than [`MAX_OPERATORS`](crate::expr::MAX_OPERATORS).
    #[error("too many operators at position {position}")]
    TooManyOperators { position: usize },
}

impl ParseError {
    /// Character offset the error points at.
    pub fn position(&self) -> usize {
        match self {
            ParseError::UnexpectedCharacter { position, .. }
            | ParseError::UnexpectedOperator { position, .. }
            | ParseError::UnmatchedParenthesis { position }
            | ParseError::UnexpectedClosingParenthesis { position }
            | ParseError::EmptyFactor { position }
            | ParseError::InvalidNumber { position, .. }
            | ParseError::InvalidVariable { position, .. }
            | ParseError::TrailingInput { position, .. }
            | ParseError::TooDeep { position }
            | ParseError::TooManyOperators { position } => *position,
        }
    }
}

/// Failure evaluating a single expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The variable was not present in the evaluation context.
    #[error("can't find variable {variable}")]
    VariableNotFound { variable: String },
}

/// Failure talking to a monitor backend.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The backend could not serve the request.
    #[error("monitor {monitor} unavailable: {reason}")]
    Unavailable { monitor: String, reason: String },

    /// No monitor is registered under this id.
    #[error("no monitor registered as '{monitor}'")]
    Unregistered { monitor: String },
}

/// Failure registering a monitor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Monitor ids must be usable in expressions, i.e. letters only.
    #[error("invalid monitor id '{0}': ids must consist of letters only")]
    InvalidId(String),

    /// A monitor with this id is already registered.
    #[error("monitor '{0}' is already registered")]
    Duplicate(String),
}
