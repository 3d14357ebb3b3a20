//! # srvwatch-types
//!
//! Value types shared between monitor backends, the expression engine and
//! the history tracker.
//!
//! ## Features
//!
//! - `serde`: serialization of all types via serde
//!
//! ## Example
//!
//! ```rust
//! use srvwatch_types::{RawValue, VariableRef};
//!
//! let var: VariableRef = "mem.MemFree".parse().unwrap();
//! assert_eq!(var.monitor, "mem");
//! assert_eq!(var.key(), "mem.MemFree");
//!
//! assert_eq!(RawValue::from(42u64).to_f64(), Some(42.0));
//! assert_eq!(RawValue::from("ON").to_f64(), None);
//! ```

mod value;
mod variable;

pub use value::*;
pub use variable::*;

/// One tracked observation. `None` marks a tick where the monitor did not
/// return a usable value, so series for different variables stay aligned.
pub type Sample = Option<f64>;
