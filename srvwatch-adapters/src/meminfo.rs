//! Memory statistics from `/proc/meminfo`.
//!
//! Each line has the form `Name:   12345 kB`. The variable name is the part
//! before the colon; the value is the first whitespace-separated field after
//! it, reported as `u64`. Lines whose value does not parse are skipped.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use srvwatch_core::{Monitor, MonitorError};
use srvwatch_types::RawValue;

/// Default location of the kernel's memory statistics.
pub const DEFAULT_PATH: &str = "/proc/meminfo";

/// Monitor reading a meminfo-format file on every call.
#[derive(Debug, Clone)]
pub struct MemInfoMonitor {
    path: PathBuf,
}

impl MemInfoMonitor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<String, MonitorError> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| MonitorError::Unavailable {
                monitor: self.path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

impl Default for MemInfoMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_PATH)
    }
}

/// Split a meminfo line into its name and raw value text.
fn split_line(line: &str) -> Option<(&str, &str)> {
    let (name, rest) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some((name, rest.split_whitespace().next().unwrap_or("")))
}

#[async_trait]
impl Monitor for MemInfoMonitor {
    async fn list_variables(&self) -> Result<Vec<String>, MonitorError> {
        let data = self.read().await?;
        Ok(data
            .lines()
            .filter_map(split_line)
            .map(|(name, _)| name.to_string())
            .collect())
    }

    async fn fetch_values(
        &self,
        names: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, RawValue>, MonitorError> {
        let data = self.read().await?;
        let mut values = BTreeMap::new();
        for (name, value) in data.lines().filter_map(split_line) {
            if !names.contains(name) {
                continue;
            }
            match value.parse::<u64>() {
                Ok(v) => {
                    values.insert(name.to_string(), RawValue::U64(v));
                }
                Err(_) => tracing::debug!(variable = name, value, "unparsable meminfo value"),
            }
        }
        Ok(values)
    }
}
