//! Text sparklines for tracked series.

use srvwatch_core::Sample;

const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Placeholder for an absent sample.
const GAP: char = ' ';

/// Normalize samples to 0-7 for 8 bar levels.
///
/// Absent or non-finite samples map to `None`. A flat series sits on the
/// lowest bar.
pub fn levels(samples: &[Sample]) -> Vec<Option<u8>> {
    let finite = samples.iter().flatten().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let range = max - min;

    samples
        .iter()
        .map(|s| {
            let v = s.filter(|v| v.is_finite())?;
            if range <= 0.0 {
                return Some(0);
            }
            let normalized = ((v - min) / range * 7.0).round() as u8;
            Some(normalized.min(7))
        })
        .collect()
}

/// Render the most recent `width` samples, padded on the left.
pub fn render(samples: &[Sample], width: usize) -> String {
    let start = samples.len().saturating_sub(width);
    let line: String = levels(&samples[start..])
        .into_iter()
        .map(|l| l.map_or(GAP, |l| SPARKLINE_CHARS[l as usize]))
        .collect();
    format!("{:>width$}", line, width = width)
}
