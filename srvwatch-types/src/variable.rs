//! Fully qualified variable references.

use std::fmt;
use std::str::FromStr;

/// A reference to one variable of one monitor, written `monitor.variable`.
///
/// Both halves are case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableRef {
    /// Id of the monitor the variable belongs to.
    pub monitor: String,
    /// Variable name within the monitor's catalog.
    pub variable: String,
}

impl VariableRef {
    /// Create a reference from its two halves.
    pub fn new(monitor: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            monitor: monitor.into(),
            variable: variable.into(),
        }
    }

    /// The flat `monitor.variable` key used in evaluation contexts.
    pub fn key(&self) -> String {
        format!("{}.{}", self.monitor, self.variable)
    }
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.monitor, self.variable)
    }
}

/// Error returned when a string is not of the form `monitor.variable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidVariableRef(pub String);

impl fmt::Display for InvalidVariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not of the form monitor.variable", self.0)
    }
}

impl std::error::Error for InvalidVariableRef {}

impl FromStr for VariableRef {
    type Err = InvalidVariableRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((monitor, variable))
                if !monitor.is_empty() && !variable.is_empty() && !variable.contains('.') =>
            {
                Ok(Self::new(monitor, variable))
            }
            _ => Err(InvalidVariableRef(s.to_string())),
        }
    }
}
