//! Terminal rendering with ratatui.

pub mod dashboard;
pub mod sparkline;
mod theme;

pub use theme::Theme;

/// Format a value compactly (e.g. 1234567 -> "1.23M").
pub fn format_value(v: f64) -> String {
    let abs = v.abs();
    if !v.is_finite() {
        v.to_string()
    } else if abs >= 1e9 {
        format!("{:.2}G", v / 1e9)
    } else if abs >= 1e6 {
        format!("{:.2}M", v / 1e6)
    } else if abs >= 1e4 {
        format!("{:.1}K", v / 1e3)
    } else if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{:.2}", v)
    }
}
