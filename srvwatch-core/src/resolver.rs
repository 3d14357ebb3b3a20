//! Batched variable resolution and evaluation.
//!
//! The resolver groups every variable referenced by a set of expressions by
//! monitor, fetches each monitor exactly once, and evaluates all expressions
//! against the resulting shared [`Context`].

use std::collections::{BTreeMap, BTreeSet};

use futures_util::future::join_all;

use crate::context::Context;
use crate::error::{EvalError, MonitorError, ParseError};
use crate::expr::Expression;
use crate::monitor::MonitorRegistry;

/// A named expression registered for repeated evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedVariable {
    pub name: String,
    pub expression: Expression,
}

impl ComputedVariable {
    pub fn new(name: impl Into<String>, expression: Expression) -> Self {
        Self {
            name: name.into(),
            expression,
        }
    }

    /// Parse `text` and name the result.
    pub fn parse(name: impl Into<String>, text: &str) -> Result<Self, ParseError> {
        Ok(Self::new(name, Expression::parse(text)?))
    }
}

/// Resolves expression variables against a [`MonitorRegistry`].
///
/// Holds no state between calls.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: &'a MonitorRegistry,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a MonitorRegistry) -> Self {
        Self { registry }
    }

    /// Fetch every variable referenced by `exprs` into one context.
    ///
    /// Issues at most one fetch per distinct monitor. Unregistered or
    /// failing monitors contribute nothing; expressions that reference them
    /// fail later with [`EvalError::VariableNotFound`].
    pub async fn resolve<'e, I>(&self, exprs: I) -> Context
    where
        I: IntoIterator<Item = &'e Expression>,
    {
        let mut wanted: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for expr in exprs {
            for var in expr.variables() {
                wanted
                    .entry(var.monitor.as_str())
                    .or_default()
                    .insert(var.variable.clone());
            }
        }

        let fetches = wanted.into_iter().map(|(monitor_id, names)| async move {
            let result = match self.registry.get(monitor_id) {
                Some(monitor) => monitor.fetch_values(&names).await,
                None => Err(MonitorError::Unregistered {
                    monitor: monitor_id.to_string(),
                }),
            };
            (monitor_id, result)
        });

        let mut ctx = Context::new();
        for (monitor_id, result) in join_all(fetches).await {
            let values = match result {
                Ok(values) => values,
                Err(e) => {
                    tracing::warn!(monitor = monitor_id, error = %e, "fetch failed, treating values as missing");
                    continue;
                }
            };
            for (name, raw) in values {
                match raw.to_f64() {
                    Some(value) => ctx.insert(format!("{}.{}", monitor_id, name), value),
                    None => tracing::debug!(
                        monitor = monitor_id,
                        variable = %name,
                        kind = raw.kind(),
                        "dropping non-numeric value"
                    ),
                }
            }
        }
        ctx
    }

    /// Resolve and evaluate a single expression.
    pub async fn evaluate_one(&self, expr: &Expression) -> Result<f64, EvalError> {
        let ctx = self.resolve([expr]).await;
        expr.evaluate(&ctx)
    }

    /// Resolve and evaluate a batch of computed variables.
    ///
    /// Variables sharing monitors share fetches. The result holds every
    /// variable that evaluated successfully; failures are left out and do
    /// not affect their siblings.
    pub async fn evaluate_batch(&self, computed: &[ComputedVariable]) -> BTreeMap<String, f64> {
        let ctx = self.resolve(computed.iter().map(|cv| &cv.expression)).await;

        let mut results = BTreeMap::new();
        for cv in computed {
            match cv.expression.evaluate(&ctx) {
                Ok(value) => {
                    results.insert(cv.name.clone(), value);
                }
                Err(e) => tracing::debug!(name = %cv.name, error = %e, "computed variable failed"),
            }
        }
        results
    }
}
