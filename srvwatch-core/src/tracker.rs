//! Background history sampling for one monitor.
//!
//! Each [`MonitorTrack`] owns a set of bounded rolling buffers, one per
//! tracked variable, and a sampling loop that refreshes all of them with a
//! single batched fetch per tick.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use srvwatch_types::Sample;
use tokio::sync::watch;
use tokio::time::{Instant, Sleep};

use crate::monitor::Monitor;

/// Delay between [`MonitorTrack::start`] and the first tick.
pub const WARMUP_DELAY: Duration = Duration::from_secs(1);

/// Samples reserved up front; larger histories grow as they fill.
const PREALLOC_LIMIT: usize = 1024;

/// A bounded, append-only sequence of samples.
///
/// The length never exceeds the capacity; pushing onto a full series evicts
/// the oldest sample.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSeries {
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl TrackedSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity.min(PREALLOC_LIMIT)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append a sample, evicting from the oldest end when full.
    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        self.trim();
    }

    /// Change the capacity, dropping the oldest samples if shrinking.
    pub fn resize(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.trim();
    }

    /// Samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    /// The most recent sample, if any tick has happened.
    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    fn trim(&mut self) {
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }
}

/// Whether a tracker currently has anything to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// No tracked variables; ticks issue no fetch.
    Idle,
    /// At least one tracked variable.
    Sampling,
}

#[derive(Debug)]
struct TrackInner {
    monitor_id: String,
    monitor: Arc<dyn Monitor>,
    series: Mutex<BTreeMap<String, TrackedSeries>>,
    interval: watch::Sender<Duration>,
    /// Bumped by every `start`; a loop exits once it no longer owns the latest epoch.
    epoch: watch::Sender<u64>,
}

/// History tracker for a single monitor.
///
/// Cloning yields another handle to the same tracker. Mutations
/// ([`set_track`](Self::set_track), [`set_interval`](Self::set_interval))
/// may come from any thread while the sampling loop runs; they are
/// linearized against ticks by an internal lock.
///
/// # Example
///
/// ```rust,no_run
/// # use srvwatch_core::MonitorRegistry;
/// # use std::time::Duration;
/// # async fn demo(registry: &MonitorRegistry) {
/// let track = registry.track("mem").unwrap();
/// track.set_track("MemFree", 60);
/// track.set_interval(Duration::from_secs(5));
/// let handle = track.start();
///
/// // ... later
/// let history = track.snapshot("MemFree").unwrap_or_default();
/// handle.stop();
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MonitorTrack {
    inner: Arc<TrackInner>,
}

impl MonitorTrack {
    /// Create an idle tracker with no tracked variables and interval zero.
    pub fn new(monitor_id: impl Into<String>, monitor: Arc<dyn Monitor>) -> Self {
        let (interval, _) = watch::channel(Duration::ZERO);
        let (epoch, _) = watch::channel(0);
        Self {
            inner: Arc::new(TrackInner {
                monitor_id: monitor_id.into(),
                monitor,
                series: Mutex::new(BTreeMap::new()),
                interval,
                epoch,
            }),
        }
    }

    pub fn monitor_id(&self) -> &str {
        &self.inner.monitor_id
    }

    /// Track `variable` with room for `capacity` samples.
    ///
    /// A capacity of zero stops tracking and discards the buffered history.
    /// Otherwise the series is created, or resized keeping the newest samples.
    pub fn set_track(&self, variable: &str, capacity: usize) {
        let mut series = self.inner.series.lock();
        if capacity == 0 {
            if series.remove(variable).is_some() {
                tracing::debug!(monitor = %self.inner.monitor_id, variable, "stopped tracking");
            }
            return;
        }
        series
            .entry(variable.to_string())
            .and_modify(|s| s.resize(capacity))
            .or_insert_with(|| TrackedSeries::new(capacity));
        tracing::debug!(monitor = %self.inner.monitor_id, variable, capacity, "tracking");
    }

    /// Change the sampling period.
    ///
    /// A running loop rearms its timer immediately, so the next tick happens
    /// one new period from now. `Duration::ZERO` disarms periodic sampling.
    /// During warm-up the first tick keeps its schedule and the new period
    /// applies from there on.
    pub fn set_interval(&self, interval: Duration) {
        self.inner.interval.send_replace(interval);
        tracing::debug!(monitor = %self.inner.monitor_id, ?interval, "sampling interval changed");
    }

    /// Current sampling period.
    pub fn interval(&self) -> Duration {
        *self.inner.interval.borrow()
    }

    pub fn state(&self) -> TrackState {
        if self.inner.series.lock().is_empty() {
            TrackState::Idle
        } else {
            TrackState::Sampling
        }
    }

    /// Tracked variable names and their capacities.
    pub fn tracked(&self) -> BTreeMap<String, usize> {
        self.inner
            .series
            .lock()
            .iter()
            .map(|(name, s)| (name.clone(), s.capacity()))
            .collect()
    }

    /// Recent samples of one variable, oldest first.
    ///
    /// Returns `None` if the variable is not tracked.
    pub fn snapshot(&self, variable: &str) -> Option<Vec<Sample>> {
        self.inner
            .series
            .lock()
            .get(variable)
            .map(|s| s.samples().copied().collect())
    }

    /// Recent samples of every tracked variable.
    pub fn snapshot_all(&self) -> BTreeMap<String, Vec<Sample>> {
        self.inner
            .series
            .lock()
            .iter()
            .map(|(name, s)| (name.clone(), s.samples().copied().collect()))
            .collect()
    }

    /// Run one sampling tick.
    ///
    /// Issues a single fetch for every tracked variable and appends one
    /// sample to each series; variables the monitor did not return get an
    /// absent sample. A failed fetch counts as all-absent.
    pub async fn sample(&self) {
        let names: BTreeSet<String> = self.inner.series.lock().keys().cloned().collect();
        if names.is_empty() {
            return;
        }

        let values = match self.inner.monitor.fetch_values(&names).await {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(monitor = %self.inner.monitor_id, error = %e, "sampling fetch failed");
                BTreeMap::new()
            }
        };

        // Variables added while the fetch was in flight get an absent sample.
        let mut series = self.inner.series.lock();
        for (name, s) in series.iter_mut() {
            s.push(values.get(name).and_then(|v| v.to_f64()));
        }
        tracing::trace!(monitor = %self.inner.monitor_id, variables = series.len(), "sampled");
    }

    /// Spawn the sampling loop.
    ///
    /// The first tick fires after [`WARMUP_DELAY`], later ones every
    /// [`interval`](Self::interval). Starting again replaces the running
    /// loop, so a tracker never samples on two timers. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) -> SamplingHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let track = self.clone();
        let interval_rx = self.inner.interval.subscribe();
        self.inner.epoch.send_modify(|epoch| *epoch += 1);
        let epoch_rx = self.inner.epoch.subscribe();

        tracing::debug!(monitor = %self.inner.monitor_id, "starting sampling loop");
        tokio::spawn(track.run(interval_rx, epoch_rx, stop_rx));

        SamplingHandle { stop_tx }
    }

    async fn run(
        self,
        mut interval_rx: watch::Receiver<Duration>,
        mut epoch_rx: watch::Receiver<u64>,
        mut stop_rx: watch::Receiver<bool>,
    ) {
        let sleep = tokio::time::sleep(WARMUP_DELAY);
        tokio::pin!(sleep);
        let mut armed = true;
        let mut warming = true;

        loop {
            tokio::select! {
                _ = &mut sleep, if armed => {
                    warming = false;
                    self.sample().await;
                    let period = *interval_rx.borrow_and_update();
                    armed = rearm(sleep.as_mut(), period);
                }
                changed = interval_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let period = *interval_rx.borrow_and_update();
                    // the first tick reads the latest period when it fires
                    if !warming {
                        armed = rearm(sleep.as_mut(), period);
                    }
                }
                _ = epoch_rx.changed() => {
                    tracing::debug!(monitor = %self.inner.monitor_id, "sampling loop replaced");
                    break;
                }
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(monitor = %self.inner.monitor_id, "sampling loop stopped");
    }
}

fn rearm(sleep: Pin<&mut Sleep>, period: Duration) -> bool {
    if period.is_zero() {
        return false;
    }
    match Instant::now().checked_add(period) {
        Some(deadline) => {
            sleep.reset(deadline);
            true
        }
        None => {
            tracing::warn!(?period, "sampling interval out of range, periodic sampling disarmed");
            false
        }
    }
}

/// Handle for a running sampling loop.
///
/// Dropping the handle stops the loop, as does calling [`stop`](Self::stop).
#[derive(Debug)]
pub struct SamplingHandle {
    stop_tx: watch::Sender<bool>,
}

impl SamplingHandle {
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use async_trait::async_trait;
    use srvwatch_types::RawValue;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::sync::Notify;

    /// Returns an incrementing counter for "x", text for "label", nothing else.
    #[derive(Debug, Default)]
    struct Counter {
        ticks: AtomicU64,
        fetches: AtomicU64,
        fail: bool,
    }

    #[async_trait]
    impl Monitor for Counter {
        async fn list_variables(&self) -> Result<Vec<String>, MonitorError> {
            Ok(vec!["x".to_string(), "label".to_string()])
        }

        async fn fetch_values(
            &self,
            names: &BTreeSet<String>,
        ) -> Result<BTreeMap<String, RawValue>, MonitorError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(MonitorError::Unavailable {
                    monitor: "counter".to_string(),
                    reason: "down".to_string(),
                });
            }
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            let mut values = BTreeMap::new();
            if names.contains("x") {
                values.insert("x".to_string(), RawValue::U64(tick));
            }
            if names.contains("label") {
                values.insert("label".to_string(), RawValue::from("busy"));
            }
            Ok(values)
        }
    }

    /// Parks inside `fetch_values` until released; every requested name is 1.
    #[derive(Debug, Default)]
    struct Gated {
        entered: Notify,
        release: Notify,
        requested: Mutex<Vec<BTreeSet<String>>>,
    }

    #[async_trait]
    impl Monitor for Gated {
        async fn list_variables(&self) -> Result<Vec<String>, MonitorError> {
            Ok(Vec::new())
        }

        async fn fetch_values(
            &self,
            names: &BTreeSet<String>,
        ) -> Result<BTreeMap<String, RawValue>, MonitorError> {
            self.requested.lock().push(names.clone());
            self.entered.notify_one();
            self.release.notified().await;
            Ok(names.iter().map(|n| (n.clone(), RawValue::U64(1))).collect())
        }
    }

    fn tracker() -> (MonitorTrack, Arc<Counter>) {
        let counter = Arc::new(Counter::default());
        (MonitorTrack::new("c", counter.clone()), counter)
    }

    #[test]
    fn series_evicts_oldest() {
        let mut s = TrackedSeries::new(3);
        for i in 0..4 {
            s.push(Some(i as f64));
        }
        assert_eq!(s.len(), 3);
        assert_eq!(s.samples().copied().collect::<Vec<_>>(), vec![Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(s.latest(), Some(Some(3.0)));
    }

    #[test]
    fn series_shrink_keeps_newest() {
        let mut s = TrackedSeries::new(5);
        for i in 0..5 {
            s.push(Some(i as f64));
        }
        s.resize(2);
        assert_eq!(s.capacity(), 2);
        assert_eq!(s.samples().copied().collect::<Vec<_>>(), vec![Some(3.0), Some(4.0)]);
    }

    #[test]
    fn huge_capacity_allocates_on_demand() {
        let mut s = TrackedSeries::new(usize::MAX / 2);
        s.push(Some(1.0));
        assert_eq!(s.len(), 1);
        assert_eq!(s.capacity(), usize::MAX / 2);
    }

    #[tokio::test]
    async fn huge_history_is_accepted() {
        let (track, _) = tracker();
        track.set_track("x", usize::MAX / 2);
        track.sample().await;
        assert_eq!(track.snapshot("x").unwrap(), vec![Some(0.0)]);
        assert_eq!(track.tracked()["x"], usize::MAX / 2);
    }

    #[tokio::test]
    async fn window_holds_capacity_samples() {
        let (track, _) = tracker();
        track.set_track("x", 3);

        for _ in 0..3 {
            track.sample().await;
        }
        assert_eq!(track.snapshot("x").unwrap(), vec![Some(0.0), Some(1.0), Some(2.0)]);

        track.sample().await;
        assert_eq!(track.snapshot("x").unwrap(), vec![Some(1.0), Some(2.0), Some(3.0)]);

        track.set_track("x", 0);
        assert!(track.snapshot("x").is_none());
        assert_eq!(track.state(), TrackState::Idle);
    }

    #[tokio::test]
    async fn one_fetch_per_tick_with_absent_markers() {
        let (track, counter) = tracker();
        track.set_track("x", 10);
        track.set_track("label", 10);
        track.set_track("missing", 10);

        track.sample().await;
        track.sample().await;

        assert_eq!(counter.fetches.load(Ordering::SeqCst), 2);
        let all = track.snapshot_all();
        assert_eq!(all["x"], vec![Some(0.0), Some(1.0)]);
        // text values are not numeric
        assert_eq!(all["label"], vec![None, None]);
        assert_eq!(all["missing"], vec![None, None]);
    }

    #[tokio::test]
    async fn idle_tick_skips_fetch() {
        let (track, counter) = tracker();
        assert_eq!(track.state(), TrackState::Idle);
        track.sample().await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_fetch_records_absent_samples() {
        let counter = Arc::new(Counter {
            fail: true,
            ..Default::default()
        });
        let track = MonitorTrack::new("c", counter);
        track.set_track("x", 4);
        track.sample().await;
        assert_eq!(track.snapshot("x").unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn resize_existing_track() {
        let (track, _) = tracker();
        track.set_track("x", 5);
        for _ in 0..5 {
            track.sample().await;
        }
        track.set_track("x", 2);
        assert_eq!(track.snapshot("x").unwrap(), vec![Some(3.0), Some(4.0)]);
        assert_eq!(track.tracked()["x"], 2);
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_after_warmup() {
        let (track, counter) = tracker();
        track.set_track("x", 10);
        let _handle = track.start();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 1);

        // interval zero: no periodic resampling
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_ticks_follow_interval() {
        let (track, counter) = tracker();
        track.set_track("x", 10);
        track.set_interval(Duration::from_secs(2));
        let _handle = track.start();

        // warm-up at 1s, then 3s, 5s
        tokio::time::sleep(Duration::from_millis(5500)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_rearms_immediately() {
        let (track, counter) = tracker();
        track.set_track("x", 10);
        track.set_interval(Duration::from_secs(10));
        let _handle = track.start();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 1);

        // next tick was due at 11s; rearm to 1.5s + 2s
        track.set_interval(Duration::from_secs(2));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_the_loop() {
        let (track, counter) = tracker();
        track.set_track("x", 10);
        track.set_interval(Duration::from_secs(1));
        let handle = track.start();

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let before = counter.fetches.load(Ordering::SeqCst);
        handle.stop();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn changes_during_fetch_apply_to_that_tick() {
        let gate = Arc::new(Gated::default());
        let track = MonitorTrack::new("g", gate.clone());
        track.set_track("x", 3);

        let tick = tokio::spawn({
            let track = track.clone();
            async move { track.sample().await }
        });
        gate.entered.notified().await;

        track.set_track("y", 3);
        track.set_track("x", 0);
        gate.release.notify_one();
        tick.await.unwrap();

        // x was dropped mid-fetch; y joined after the request went out
        assert!(track.snapshot("x").is_none());
        assert_eq!(track.snapshot("y").unwrap(), vec![None]);

        gate.release.notify_one();
        track.sample().await;
        assert_eq!(track.snapshot_all().len(), 1);
        assert_eq!(track.snapshot("y").unwrap(), vec![None, Some(1.0)]);

        let requested = gate.requested.lock();
        assert_eq!(requested[0], BTreeSet::from(["x".to_string()]));
        assert_eq!(requested[1], BTreeSet::from(["y".to_string()]));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_disarms_running_loop() {
        let (track, counter) = tracker();
        track.set_track("x", 10);
        track.set_interval(Duration::from_secs(1));
        let _handle = track.start();

        // ticks at 1s and 2s
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 2);

        track.set_interval(Duration::ZERO);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_interval_disarms() {
        let (track, counter) = tracker();
        track.set_track("x", 10);
        track.set_interval(Duration::from_secs(1));
        let _handle = track.start();

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 1);

        track.set_interval(Duration::MAX);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 1);

        // rearmed at 6.5s: ticks at 7.5s and 8.5s
        track.set_interval(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_change_during_warmup_keeps_first_tick() {
        let (track, counter) = tracker();
        track.set_track("x", 10);
        let _handle = track.start();

        tokio::time::sleep(Duration::from_millis(500)).await;
        track.set_interval(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 1);

        // first tick at 1s, next one period later
        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_during_warmup_still_ticks_once() {
        let (track, counter) = tracker();
        track.set_track("x", 10);
        track.set_interval(Duration::from_secs(1));
        let _handle = track.start();

        tokio::time::sleep(Duration::from_millis(500)).await;
        track.set_interval(Duration::ZERO);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_loop() {
        let (track, counter) = tracker();
        track.set_track("x", 10);
        track.set_interval(Duration::from_secs(1));
        let first = track.start();
        let _second = track.start();

        // one timer: ticks at 1s, 2s and 3s
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 3);

        // the replaced handle no longer controls sampling
        first.stop();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.fetches.load(Ordering::SeqCst), 4);
    }
}
