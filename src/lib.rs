//! # srvwatch
//!
//! Derived server metrics from pluggable monitors.
//!
//! Monitors (memory statistics, MySQL status, constants) expose named
//! variables; computed variables are arithmetic expressions over them, such
//! as `(mem.MemTotal - mem.MemFree) / mem.MemTotal * 100`. Each monitor can
//! also track a rolling history of selected variables on its own timer. This
//! crate wires those pieces from a config file and renders them on the
//! command line or in a live terminal dashboard.
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────────────┐   ┌───────────┐
//! │   config    │──▶│ Engine (registry + computed) │──▶│    app    │──▶ ui
//! │ (TOML, env) │   └──────────────┬───────────────┘   │ (state)   │
//! └─────────────┘                  │                   └───────────┘
//!                         srvwatch-core / -adapters
//! ```
//!
//! - **[`config`]**: settings loading and [`Engine`] construction
//! - **[`app`]**: dashboard state, selection and interval control
//! - **[`ui`]**: ratatui rendering with sparklines and theme support
//! - **[`events`]**: keyboard handling
//!
//! ## Library use
//!
//! ```no_run
//! use srvwatch::Settings;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let engine = Settings::load(Some("srvwatch.toml".as_ref()))?.build()?;
//! let values = srvwatch_core::Resolver::new(&engine.registry)
//!     .evaluate_batch(&engine.computed)
//!     .await;
//! for (name, value) in values {
//!     println!("{name} = {value}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod duration;
pub mod events;
pub mod ui;

pub use app::App;
pub use config::{ComputedReport, Engine, Settings};
