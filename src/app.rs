//! Dashboard state and interaction logic.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use srvwatch_core::{Resolver, Sample};

use crate::config::Engine;
use crate::duration::format_duration;
use crate::ui::Theme;

/// Interval assigned when speeding up a monitor that is switched off.
const RESUME_INTERVAL: Duration = Duration::from_secs(1);

/// Halving stops here.
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Doubling stops here.
const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// How long a status message stays visible.
const STATUS_TTL: Duration = Duration::from_secs(3);

/// One tracked variable as shown in the sparkline table.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRow {
    pub monitor: String,
    pub variable: String,
    pub capacity: usize,
    pub interval: Duration,
    pub samples: Vec<Sample>,
}

impl TrackRow {
    /// Most recent sample, if it was a value.
    pub fn latest(&self) -> Option<f64> {
        self.samples.last().copied().flatten()
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub engine: Engine,
    /// Latest computed values; failed evaluations are absent.
    pub values: BTreeMap<String, f64>,
    pub rows: Vec<TrackRow>,
    pub selected: usize,
    pub theme: Theme,
    pub last_refresh: Option<Instant>,
    status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(engine: Engine, theme: Theme) -> Self {
        Self {
            running: true,
            engine,
            values: BTreeMap::new(),
            rows: Vec::new(),
            selected: 0,
            theme,
            last_refresh: None,
            status_message: None,
        }
    }

    /// Re-evaluate every computed variable and reload tracked series.
    pub async fn refresh(&mut self) {
        self.values = Resolver::new(&self.engine.registry)
            .evaluate_batch(&self.engine.computed)
            .await;
        self.reload_rows();
        self.last_refresh = Some(Instant::now());
    }

    /// Copy the current tracker buffers into `rows`.
    pub fn reload_rows(&mut self) {
        let registry = &self.engine.registry;
        self.rows = registry
            .ids()
            .filter_map(|id| registry.track(id))
            .flat_map(|track| {
                let interval = track.interval();
                let capacities = track.tracked();
                track
                    .snapshot_all()
                    .into_iter()
                    .map(move |(variable, samples)| TrackRow {
                        monitor: track.monitor_id().to_string(),
                        capacity: capacities.get(&variable).copied().unwrap_or(0),
                        interval,
                        variable,
                        samples,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        if self.selected >= self.rows.len() {
            self.selected = self.rows.len().saturating_sub(1);
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected_row(&self) -> Option<&TrackRow> {
        self.rows.get(self.selected)
    }

    /// Double (`slower`) or halve the sampling interval of the selected
    /// row's monitor.
    pub fn adjust_interval(&mut self, slower: bool) {
        let Some(monitor) = self.selected_row().map(|r| r.monitor.clone()) else {
            return;
        };
        let Some(track) = self.engine.registry.track(&monitor) else {
            return;
        };

        let current = track.interval();
        let next = if current.is_zero() {
            RESUME_INTERVAL
        } else if slower {
            current.saturating_mul(2).min(MAX_INTERVAL)
        } else {
            (current / 2).max(MIN_INTERVAL)
        };
        track.set_interval(next);
        tracing::info!(monitor = %monitor, interval = ?next, "sampling interval changed");

        for row in self.rows.iter_mut().filter(|r| r.monitor == monitor) {
            row.interval = next;
        }
        self.set_status_message(format!("{}: sampling every {}", monitor, format_duration(next)));
    }

    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Current status message, if it hasn't expired.
    pub fn status_message(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, at)) if at.elapsed() < STATUS_TTL => Some(msg),
            _ => None,
        }
    }
}
