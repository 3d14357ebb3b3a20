//! # srvwatch-adapters
//!
//! Ready-made [`Monitor`](srvwatch_core::Monitor) backends.
//!
//! ## Supported Sources
//!
//! - **meminfo** - Linux `/proc/meminfo` style files, one variable per line
//! - **static** - an in-process table of values set by the host program
//! - **MySQL** (`mysql` feature) - server status counters from `SHOW GLOBAL STATUS`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use srvwatch_adapters::MemInfoMonitor;
//! use srvwatch_core::{Expression, MonitorRegistry, Resolver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = MonitorRegistry::new();
//!     registry.register("mem", Arc::new(MemInfoMonitor::default()))?;
//!
//!     let expr = Expression::parse("mem.MemAvailable / mem.MemTotal * 100")?;
//!     let pct = Resolver::new(&registry).evaluate_one(&expr).await?;
//!     println!("{:.1}% available", pct);
//!     Ok(())
//! }
//! ```

pub mod meminfo;
pub mod fixed;

#[cfg(feature = "mysql")]
pub mod mysql;

pub use fixed::StaticMonitor;
pub use meminfo::MemInfoMonitor;

#[cfg(feature = "mysql")]
pub use mysql::MysqlMonitor;
