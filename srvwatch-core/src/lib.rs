//! # srvwatch-core
//!
//! A small derived-metric engine. Expressions such as
//! `(mem.MemTotal - mem.MemFree) / mem.MemTotal * 100` reference variables
//! exposed by pluggable [`Monitor`] backends; the [`Resolver`] fetches every
//! referenced variable with one batched call per monitor and evaluates the
//! expressions against the result. Independently, each monitor's
//! [`MonitorTrack`] samples tracked variables into bounded rolling buffers.
//!
//! ```text
//! text ──parse──▶ Expression ──variables()──▶ Resolver ──fetch_values()──▶ Monitor
//!                     │                          │
//!                     └──────evaluate(ctx)◀──────┘ Context
//!
//! MonitorTrack ──(own timer)──fetch_values()──▶ Monitor
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use srvwatch_core::{ComputedVariable, MonitorRegistry, Resolver};
//! # use srvwatch_core::Monitor;
//! # async fn demo(mem: Arc<dyn Monitor>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = MonitorRegistry::new();
//! registry.register("mem", mem)?;
//!
//! let computed = vec![
//!     ComputedVariable::parse("used", "mem.MemTotal - mem.MemFree")?,
//!     ComputedVariable::parse("free_pct", "mem.MemFree / mem.MemTotal * 100")?,
//! ];
//!
//! // one fetch to "mem" serves both expressions
//! let values = Resolver::new(&registry).evaluate_batch(&computed).await;
//! # Ok(())
//! # }
//! ```

mod context;
pub mod error;
pub mod expr;
mod monitor;
mod resolver;
pub mod tracker;

pub use context::Context;
pub use error::{EvalError, MonitorError, ParseError, RegistryError};
pub use expr::{BinaryOperator, Expression, Node, MAX_DEPTH, MAX_OPERATORS};
pub use monitor::{Monitor, MonitorRegistry, TrackingHandle};
pub use resolver::{ComputedVariable, Resolver};
pub use tracker::{MonitorTrack, SamplingHandle, TrackState, TrackedSeries};

// Re-export types for convenience
pub use srvwatch_types::{RawValue, Sample, VariableRef};
