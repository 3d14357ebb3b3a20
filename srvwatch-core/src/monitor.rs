//! Monitor capability and the registry of configured monitors.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use srvwatch_types::RawValue;

use crate::error::{MonitorError, RegistryError};
use crate::tracker::{MonitorTrack, SamplingHandle};

/// A pluggable data source exposing named variables.
///
/// Implementations talk to whatever backs the monitor (procfs, a database,
/// an in-memory table) and are responsible for their own timeouts.
///
/// # Example
///
/// ```rust
/// use std::collections::{BTreeMap, BTreeSet};
/// use async_trait::async_trait;
/// use srvwatch_core::{Monitor, MonitorError};
/// use srvwatch_types::RawValue;
///
/// #[derive(Debug)]
/// struct Uptime;
///
/// #[async_trait]
/// impl Monitor for Uptime {
///     async fn list_variables(&self) -> Result<Vec<String>, MonitorError> {
///         Ok(vec!["seconds".to_string()])
///     }
///
///     async fn fetch_values(
///         &self,
///         names: &BTreeSet<String>,
///     ) -> Result<BTreeMap<String, RawValue>, MonitorError> {
///         let mut values = BTreeMap::new();
///         if names.contains("seconds") {
///             values.insert("seconds".to_string(), RawValue::U64(3600));
///         }
///         Ok(values)
///     }
/// }
/// ```
#[async_trait]
pub trait Monitor: Send + Sync + Debug {
    /// The variable catalog. Order is not meaningful.
    async fn list_variables(&self) -> Result<Vec<String>, MonitorError>;

    /// Fetch current values for a set of variables in one call.
    ///
    /// Names the monitor cannot satisfy are left out of the result; one bad
    /// name must not fail the whole call. An `Err` means the backend as a
    /// whole was unreachable.
    async fn fetch_values(
        &self,
        names: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, RawValue>, MonitorError>;
}

#[derive(Debug)]
struct MonitorEntry {
    monitor: Arc<dyn Monitor>,
    track: MonitorTrack,
}

/// All monitors known to the process, keyed by id.
///
/// Built once at startup and then shared read-only; the only mutable state
/// reachable through it is owned by each monitor's [`MonitorTrack`].
#[derive(Debug, Default)]
pub struct MonitorRegistry {
    entries: BTreeMap<String, MonitorEntry>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a monitor under `id`.
    ///
    /// Ids must be letters only so they can be written in expressions.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        monitor: Arc<dyn Monitor>,
    ) -> Result<&MonitorTrack, RegistryError> {
        let id = id.into();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RegistryError::InvalidId(id));
        }
        if self.entries.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }

        tracing::debug!(monitor = %id, "registered monitor");
        let track = MonitorTrack::new(id.clone(), monitor.clone());
        let entry = self.entries.entry(id).or_insert(MonitorEntry { monitor, track });
        Ok(&entry.track)
    }

    /// Look up a monitor.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Monitor>> {
        self.entries.get(id).map(|e| e.monitor.clone())
    }

    /// The history tracker owned by a monitor.
    pub fn track(&self, id: &str) -> Option<&MonitorTrack> {
        self.entries.get(id).map(|e| &e.track)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The variable catalog of a registered monitor.
    pub async fn list_variables(&self, id: &str) -> Result<Vec<String>, MonitorError> {
        let monitor = self.get(id).ok_or_else(|| MonitorError::Unregistered {
            monitor: id.to_string(),
        })?;
        monitor.list_variables().await
    }

    /// Start the sampling loop of every monitor's tracker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_tracking(&self) -> TrackingHandle {
        let handles = self.entries.values().map(|e| e.track.start()).collect();
        TrackingHandle { handles }
    }
}

/// Handle for every sampling loop started by [`MonitorRegistry::start_tracking`].
///
/// Dropping the handle stops all loops.
#[derive(Debug)]
pub struct TrackingHandle {
    handles: Vec<SamplingHandle>,
}

impl TrackingHandle {
    /// Stop all sampling loops.
    pub fn stop(self) {
        for handle in self.handles {
            handle.stop();
        }
    }
}
