//! Configuration loading and engine construction.
//!
//! Settings come from a TOML (or any format the `config` crate infers from
//! the extension) file plus `SRVWATCH_*` environment overrides:
//!
//! ```toml
//! interval = "5s"
//!
//! [[monitors]]
//! id = "mem"
//! driver = "meminfo"
//! track = [{ variable = "MemFree", history = 60 }]
//!
//! [[monitors]]
//! id = "app"
//! driver = "static"
//! values = [{ name = "cores", value = 8 }]
//!
//! [[computed]]
//! name = "used"
//! expr = "mem.MemTotal - mem.MemFree"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer, Serialize};
use srvwatch_adapters::{meminfo, MemInfoMonitor, StaticMonitor};
use srvwatch_core::{ComputedVariable, Monitor, MonitorRegistry};
use srvwatch_types::{Sample, VariableRef};

use crate::duration::parse_duration;

/// Config file looked up when none is given on the command line.
pub const DEFAULT_CONFIG: &str = "srvwatch.toml";

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Default sampling interval for every monitor's tracker.
    #[serde(default, deserialize_with = "optional_duration")]
    pub interval: Option<Duration>,
    #[serde(default)]
    pub monitors: Vec<MonitorConfig>,
    #[serde(default)]
    pub computed: Vec<ComputedConfig>,
}

/// One monitor instance.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Id used in expressions; letters only.
    pub id: String,
    /// Overrides [`Settings::interval`] for this monitor.
    #[serde(default, deserialize_with = "optional_duration")]
    pub interval: Option<Duration>,
    /// Variables whose history is sampled from startup.
    #[serde(default)]
    pub track: Vec<TrackConfig>,
    #[serde(flatten)]
    pub driver: DriverConfig,
}

/// Backend selection and its options.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "driver", rename_all = "lowercase")]
pub enum DriverConfig {
    /// Linux memory statistics.
    Meminfo {
        #[serde(default)]
        file: Option<PathBuf>,
    },
    /// Constant values.
    Static {
        #[serde(default)]
        values: Vec<StaticValue>,
    },
    /// MySQL server status (requires the `mysql` feature).
    Mysql { connection: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct StaticValue {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackConfig {
    pub variable: String,
    pub history: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComputedConfig {
    pub name: String,
    pub expr: String,
}

fn optional_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}

impl Settings {
    /// Load settings.
    ///
    /// An explicitly given path must exist; without one, [`DEFAULT_CONFIG`]
    /// is used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG), false),
        };

        let config = Config::builder()
            .add_source(File::from(path.as_path()).required(required))
            .add_source(Environment::with_prefix("SRVWATCH"))
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;

        let settings: Settings = config
            .try_deserialize()
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(
            path = %path.display(),
            monitors = settings.monitors.len(),
            computed = settings.computed.len(),
            "loaded settings"
        );
        Ok(settings)
    }

    /// Build the monitor registry and parse every computed variable.
    ///
    /// MySQL monitors create their connection pool here, so this must run
    /// inside a tokio runtime.
    pub fn build(&self) -> Result<Engine> {
        let mut registry = MonitorRegistry::new();
        for mc in &self.monitors {
            let monitor = mc
                .driver
                .create()
                .with_context(|| format!("failed to create monitor '{}'", mc.id))?;
            let track = registry.register(mc.id.clone(), monitor)?;

            track.set_interval(mc.interval.or(self.interval).unwrap_or(Duration::ZERO));
            for t in &mc.track {
                track.set_track(&t.variable, t.history);
            }
        }

        let mut names = BTreeSet::new();
        let mut computed = Vec::with_capacity(self.computed.len());
        for cc in &self.computed {
            if !names.insert(cc.name.as_str()) {
                bail!("computed variable '{}' is defined twice", cc.name);
            }
            let cv = ComputedVariable::parse(cc.name.as_str(), &cc.expr)
                .with_context(|| format!("invalid expression for computed variable '{}'", cc.name))?;
            computed.push(cv);
        }

        Ok(Engine { registry, computed })
    }
}

impl DriverConfig {
    fn create(&self) -> Result<Arc<dyn Monitor>> {
        match self {
            DriverConfig::Meminfo { file } => {
                let path = file.clone().unwrap_or_else(|| PathBuf::from(meminfo::DEFAULT_PATH));
                Ok(Arc::new(MemInfoMonitor::new(path)))
            }
            DriverConfig::Static { values } => Ok(Arc::new(
                values
                    .iter()
                    .map(|v| (v.name.clone(), v.value))
                    .collect::<StaticMonitor>(),
            )),
            #[cfg(feature = "mysql")]
            DriverConfig::Mysql { connection } => Ok(Arc::new(
                srvwatch_adapters::MysqlMonitor::connect_lazy(connection)?,
            )),
            #[cfg(not(feature = "mysql"))]
            DriverConfig::Mysql { .. } => {
                bail!("mysql monitors require srvwatch to be built with the `mysql` feature")
            }
        }
    }
}

/// Everything the commands operate on.
#[derive(Debug)]
pub struct Engine {
    pub registry: MonitorRegistry,
    pub computed: Vec<ComputedVariable>,
}

impl Engine {
    /// Find a computed variable by name.
    pub fn computed(&self, name: &str) -> Option<&ComputedVariable> {
        self.computed.iter().find(|cv| cv.name == name)
    }

    /// Pair every computed variable with its value from an evaluation batch.
    ///
    /// Variables missing from `values` report an absent value.
    pub fn report(&self, values: &BTreeMap<String, f64>) -> BTreeMap<String, ComputedReport> {
        self.computed
            .iter()
            .map(|cv| {
                let variables: BTreeSet<VariableRef> =
                    cv.expression.variables().into_iter().cloned().collect();
                let report = ComputedReport {
                    value: values.get(&cv.name).copied(),
                    expression: cv.expression.to_string(),
                    variables: variables.into_iter().collect(),
                };
                (cv.name.clone(), report)
            })
            .collect()
    }
}

/// One computed variable as printed by `compute --json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputedReport {
    pub value: Sample,
    pub expression: String,
    /// Distinct inputs, sorted.
    pub variables: Vec<VariableRef>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const FULL: &str = r#"
interval = "5s"

[[monitors]]
id = "mem"
driver = "meminfo"
file = "/tmp/meminfo"
interval = "2s"
track = [{ variable = "MemFree", history = 60 }, { variable = "MemTotal", history = 10 }]

[[monitors]]
id = "app"
driver = "static"
values = [{ name = "cores", value = 8 }, { name = "ratio", value = 0.5 }]

[[computed]]
name = "used"
expr = "mem.MemTotal - mem.MemFree"

[[computed]]
name = "half"
expr = "app.cores * app.ratio"
"#;

    #[test]
    fn load_full_config() {
        let file = write_config(FULL);
        let settings = Settings::load(Some(file.path())).unwrap();

        assert_eq!(settings.interval, Some(Duration::from_secs(5)));
        assert_eq!(settings.monitors.len(), 2);
        assert_eq!(settings.computed.len(), 2);

        let mem = &settings.monitors[0];
        assert_eq!(mem.id, "mem");
        assert_eq!(mem.interval, Some(Duration::from_secs(2)));
        assert_eq!(mem.track[0].variable, "MemFree");
        assert_eq!(mem.track[0].history, 60);
        assert!(matches!(
            mem.driver,
            DriverConfig::Meminfo { file: Some(ref p) } if p == Path::new("/tmp/meminfo")
        ));

        match &settings.monitors[1].driver {
            DriverConfig::Static { values } => {
                assert_eq!(values.len(), 2);
                assert_eq!(values[0].value, 8.0);
            }
            other => panic!("unexpected driver {:?}", other),
        }
    }

    #[test]
    fn build_registers_and_configures_trackers() {
        let file = write_config(FULL);
        let engine = Settings::load(Some(file.path())).unwrap().build().unwrap();

        assert_eq!(engine.registry.ids().collect::<Vec<_>>(), vec!["app", "mem"]);
        let mem = engine.registry.track("mem").unwrap();
        assert_eq!(mem.interval(), Duration::from_secs(2));
        assert_eq!(mem.tracked().len(), 2);
        // falls back to the global interval
        assert_eq!(
            engine.registry.track("app").unwrap().interval(),
            Duration::from_secs(5)
        );
        assert!(engine.computed("used").is_some());
    }

    #[tokio::test]
    async fn static_values_resolve() {
        let file = write_config(FULL);
        let engine = Settings::load(Some(file.path())).unwrap().build().unwrap();
        let half = engine.computed("half").unwrap();

        let value = srvwatch_core::Resolver::new(&engine.registry)
            .evaluate_one(&half.expression)
            .await
            .unwrap();
        assert_eq!(value, 4.0);
    }

    #[tokio::test]
    async fn report_lists_values_and_inputs() {
        let file = write_config(
            r#"
[[monitors]]
id = "app"
driver = "static"
values = [{ name = "cores", value = 8 }, { name = "ratio", value = 0.5 }]

[[computed]]
name = "half"
expr = "app.cores * app.ratio + app.cores"

[[computed]]
name = "gone"
expr = "app.missing"
"#,
        );
        let engine = Settings::load(Some(file.path())).unwrap().build().unwrap();
        let values = srvwatch_core::Resolver::new(&engine.registry)
            .evaluate_batch(&engine.computed)
            .await;
        let report = engine.report(&values);

        let half = &report["half"];
        assert_eq!(half.value, Some(12.0));
        assert_eq!(
            half.variables,
            vec![VariableRef::new("app", "cores"), VariableRef::new("app", "ratio")]
        );
        assert_eq!(report["gone"].value, None);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["half"]["value"], 12.0);
        assert_eq!(json["half"]["variables"][0]["monitor"], "app");
        assert_eq!(json["half"]["variables"][1]["variable"], "ratio");
        assert!(json["gone"]["value"].is_null());
    }

    #[test]
    fn invalid_expression_names_the_variable() {
        let file = write_config(
            r#"
[[computed]]
name = "broken"
expr = "2++3"
"#,
        );
        let err = Settings::load(Some(file.path())).unwrap().build().unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("broken"), "{}", msg);
        assert!(msg.contains("unexpected operator"), "{}", msg);
    }

    #[test]
    fn duplicate_computed_names_are_rejected() {
        let file = write_config(
            r#"
[[computed]]
name = "x"
expr = "1"

[[computed]]
name = "x"
expr = "2"
"#,
        );
        assert!(Settings::load(Some(file.path())).unwrap().build().is_err());
    }

    #[test]
    fn invalid_monitor_id_is_rejected() {
        let file = write_config(
            r#"
[[monitors]]
id = "mem1"
driver = "meminfo"
"#,
        );
        assert!(Settings::load(Some(file.path())).unwrap().build().is_err());
    }

    #[test]
    fn unknown_driver_fails_to_load() {
        let file = write_config(
            r#"
[[monitors]]
id = "x"
driver = "carrier-pigeon"
"#,
        );
        assert!(Settings::load(Some(file.path())).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
