//! Flat evaluation context.

use std::collections::HashMap;

use srvwatch_types::VariableRef;

/// Resolved variable values keyed by `monitor.variable`.
///
/// A context is built once per resolve pass and shared read-only by every
/// expression evaluated in that pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: HashMap<String, f64>,
}

impl Context {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value under its flat `monitor.variable` key.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.values.insert(key.into(), value);
    }

    /// Look up a variable.
    pub fn get(&self, var: &VariableRef) -> Option<f64> {
        self.get_key(&var.key())
    }

    /// Look up a flat `monitor.variable` key.
    pub fn get_key(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
