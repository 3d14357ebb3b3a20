//! In-process monitor backed by a table the host program updates.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use srvwatch_core::{Monitor, MonitorError};
use srvwatch_types::RawValue;

/// A monitor whose values are set directly by the host program.
///
/// Useful for constants from configuration and for values the program
/// computes itself.
///
/// # Example
///
/// ```rust
/// use srvwatch_adapters::StaticMonitor;
///
/// let monitor = StaticMonitor::new();
/// monitor.set("workers", 8u32);
/// monitor.set("mode", "leader");
/// assert_eq!(monitor.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct StaticMonitor {
    values: RwLock<BTreeMap<String, RawValue>>,
}

impl StaticMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace a value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<RawValue>) {
        self.values.write().insert(name.into(), value.into());
    }

    /// Remove a value. Returns true if it existed.
    pub fn remove(&self, name: &str) -> bool {
        self.values.write().remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for StaticMonitor {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: RwLock::new(
                iter.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl Monitor for StaticMonitor {
    async fn list_variables(&self) -> Result<Vec<String>, MonitorError> {
        Ok(self.values.read().keys().cloned().collect())
    }

    async fn fetch_values(
        &self,
        names: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, RawValue>, MonitorError> {
        let values = self.values.read();
        Ok(names
            .iter()
            .filter_map(|name| values.get(name).map(|v| (name.clone(), v.clone())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srvwatch_core::{Expression, MonitorRegistry, Resolver};
    use std::sync::Arc;

    #[tokio::test]
    async fn serves_current_values() {
        let monitor: StaticMonitor = [("a", 1.5f64), ("b", 2.0)].into_iter().collect();
        let names: BTreeSet<String> = ["a".to_string(), "c".to_string()].into();

        let values = monitor.fetch_values(&names).await.unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values["a"], RawValue::F64(1.5));

        monitor.set("a", 3u64);
        let values = monitor.fetch_values(&names).await.unwrap();
        assert_eq!(values["a"], RawValue::U64(3));
    }

    #[tokio::test]
    async fn remove_drops_value() {
        let monitor = StaticMonitor::new();
        monitor.set("x", 1i32);
        assert!(monitor.remove("x"));
        assert!(!monitor.remove("x"));
        assert!(monitor.list_variables().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn usable_through_resolver() {
        let monitor = Arc::new(StaticMonitor::new());
        monitor.set("requests", 1200u64);
        monitor.set("seconds", 60u32);

        let mut registry = MonitorRegistry::new();
        registry.register("app", monitor.clone()).unwrap();

        let expr = Expression::parse("app.requests / app.seconds").unwrap();
        let resolver = Resolver::new(&registry);
        assert_eq!(resolver.evaluate_one(&expr).await, Ok(20.0));

        monitor.set("requests", 2400u64);
        assert_eq!(resolver.evaluate_one(&expr).await, Ok(40.0));
    }
}
