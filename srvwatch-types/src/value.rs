//! Raw values as reported by monitor backends.

use std::fmt;

/// A value reported by a monitor before normalization.
///
/// Backends report whatever their source naturally produces. Only the six
/// numeric kinds take part in expression evaluation; everything else is
/// dropped when the resolver builds its context.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", content = "value", rename_all = "lowercase"))]
pub enum RawValue {
    F32(f32),
    F64(f64),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    Bool(bool),
    Text(String),
}

impl RawValue {
    /// Normalize to double precision.
    ///
    /// Returns `None` for non-numeric kinds. 64-bit integers outside the
    /// exact-integer range of `f64` are rounded to the nearest representable
    /// value.
    pub fn to_f64(&self) -> Option<f64> {
        match *self {
            RawValue::F32(v) => Some(f64::from(v)),
            RawValue::F64(v) => Some(v),
            RawValue::I32(v) => Some(f64::from(v)),
            RawValue::I64(v) => Some(v as f64),
            RawValue::U32(v) => Some(f64::from(v)),
            RawValue::U64(v) => Some(v as f64),
            RawValue::Bool(_) | RawValue::Text(_) => None,
        }
    }

    /// Short name of the value's kind, used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::F32(_) => "f32",
            RawValue::F64(_) => "f64",
            RawValue::I32(_) => "i32",
            RawValue::I64(_) => "i64",
            RawValue::U32(_) => "u32",
            RawValue::U64(_) => "u64",
            RawValue::Bool(_) => "bool",
            RawValue::Text(_) => "text",
        }
    }

    /// Returns true if [`RawValue::to_f64`] would produce a value.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, RawValue::Bool(_) | RawValue::Text(_))
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::F32(v) => write!(f, "{}", v),
            RawValue::F64(v) => write!(f, "{}", v),
            RawValue::I32(v) => write!(f, "{}", v),
            RawValue::I64(v) => write!(f, "{}", v),
            RawValue::U32(v) => write!(f, "{}", v),
            RawValue::U64(v) => write!(f, "{}", v),
            RawValue::Bool(v) => write!(f, "{}", v),
            RawValue::Text(v) => f.write_str(v),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for RawValue {
                fn from(v: $ty) -> Self {
                    RawValue::$variant(v)
                }
            }
        )*
    };
}

impl_from!(
    f32 => F32,
    f64 => F64,
    i32 => I32,
    i64 => I64,
    u32 => U32,
    u64 => U64,
    bool => Bool,
    String => Text,
);

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::Text(v.to_string())
    }
}
