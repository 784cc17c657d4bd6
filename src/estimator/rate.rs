//! The rate estimator.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::EstimatorConfig;

use super::clock::{Clock, MonotonicClock};
use super::method::EstimationMethod;
use super::samples::{Boundary, LocalLog, LockedLog, SampleLog, WindowScan};

/// Numeric stand-in for "not enough data", for callers that want a plain number.
pub const INSUFFICIENT_DATA: f64 = -1.0;
/// Default number of queries between two prunes of the sample log.
pub const DEFAULT_PRUNE_INTERVAL: u32 = 1000;
/// Fewest samples that must lie inside the window for a rate to be reported.
const MIN_SAMPLES_IN_WINDOW: usize = 2;

/// Estimates the current occurrence rate of recorded events.
///
/// Events are recorded with [`record_event`](Self::record_event) and the rate
/// is read with [`query`](Self::query), which looks at a trailing window ending
/// now. Each answered query also feeds an exponentially decayed rolling
/// average, which callers can ask for instead of the instantaneous value.
///
/// Built over a [`LockedLog`], the estimator is `Send + Sync` and can be
/// shared between recording and querying threads. The lock covers the sample
/// log only. The rolling estimate is updated atomically without it, so
/// concurrent queries never lose an update but may apply theirs in any order.
pub struct RateEstimator<C: Clock = MonotonicClock, L: SampleLog = LockedLog> {
    /// Time source for samples and queries
    clock: C,
    /// Recorded sample timestamps
    samples: L,
    /// Rolling estimate, as `f64` bits
    rolling: AtomicU64,
    /// Decay factor, as `f64` bits
    decay_factor: AtomicU64,
    /// Queries since the last prune
    queries_since_prune: AtomicU32,
    /// Queries between two prunes
    prune_interval: u32,
}

impl RateEstimator {
    /// Create a thread-safe estimator on the process monotonic clock.
    pub fn new() -> Self {
        Self::with_clock_and_log(MonotonicClock, LockedLog::new())
    }
}

impl Default for RateEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RateEstimator<MonotonicClock, LocalLog> {
    /// Create an estimator for single-threaded use, without locking.
    pub fn unsynchronized() -> Self {
        Self::with_clock_and_log(MonotonicClock, LocalLog::new())
    }
}

impl<C: Clock, L: SampleLog> RateEstimator<C, L> {
    /// Create an estimator from a time source and a sample log.
    pub fn with_clock_and_log(clock: C, samples: L) -> Self {
        Self {
            clock,
            samples,
            rolling: AtomicU64::new(0f64.to_bits()),
            decay_factor: AtomicU64::new(0f64.to_bits()),
            queries_since_prune: AtomicU32::new(0),
            prune_interval: DEFAULT_PRUNE_INTERVAL,
        }
    }

    /// Set how many queries pass between two prunes of the log.
    ///
    /// A value of zero is treated as one (prune on every query).
    pub fn with_prune_interval(mut self, interval: u32) -> Self {
        self.prune_interval = interval.max(1);
        self
    }

    /// Apply decay factor and prune interval from configuration.
    pub fn with_config(self, config: &EstimatorConfig) -> Self {
        let estimator = self.with_prune_interval(config.prune_interval);
        estimator.set_decay_factor(config.decay_factor);
        estimator
    }

    /// Set the weight given to the previous rolling estimate.
    ///
    /// Values in `[0, 1)` give sensible smoothing, with 0 disabling it.
    /// Other values are accepted as-is.
    pub fn set_decay_factor(&self, factor: f64) {
        self.decay_factor.store(factor.to_bits(), Ordering::Relaxed);
    }

    /// The weight given to the previous rolling estimate.
    pub fn decay_factor(&self) -> f64 {
        f64::from_bits(self.decay_factor.load(Ordering::Relaxed))
    }

    /// The current rolling estimate.
    pub fn rolling_estimate(&self) -> f64 {
        f64::from_bits(self.rolling.load(Ordering::Acquire))
    }

    /// Number of samples currently retained.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are retained.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Record that an event happened now.
    pub fn record_event(&self) {
        let now = self.clock.now();
        let retained = self.samples.push(now);
        trace!(retained, "Recorded sample");
    }

    /// Estimate the current event rate, in events per second.
    ///
    /// The estimate covers the trailing `window` ending now. Longer windows
    /// give steadier values but hide short-term changes. With `smoothing`,
    /// the rolling estimate is returned; either way it is updated.
    ///
    /// Returns `None` when the window does not hold enough data yet: the log
    /// must reach back past the window and at least two samples must lie
    /// inside it. The rolling estimate is left untouched in that case.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero.
    pub fn query(
        &self,
        window: Duration,
        smoothing: bool,
        method: EstimationMethod,
    ) -> Option<f64> {
        assert!(!window.is_zero(), "rate window must be non-zero");

        let now = self.clock.now();
        let scan = self.samples.scan(now, window)?;

        trace!(
            method = %method,
            window = ?window,
            inside = scan.inside,
            boundary_age = ?scan.boundary.map(|b| now.saturating_duration_since(b.at)),
            "Scanned samples"
        );

        // Pruning does not depend on whether this query yields a rate.
        self.maybe_prune(&scan);

        let instant = match method {
            EstimationMethod::CountSamples => count_samples(&scan, window),
            EstimationMethod::AverageIntervals => average_intervals(&scan),
        }?;

        let rolling = self.update_rolling(instant);

        Some(if smoothing { rolling } else { instant })
    }

    /// Like [`query`](Self::query), but reports missing data as [`INSUFFICIENT_DATA`].
    pub fn fps(&self, window: Duration, smoothing: bool, method: EstimationMethod) -> f64 {
        self.query(window, smoothing, method)
            .unwrap_or(INSUFFICIENT_DATA)
    }

    /// Discard all recorded samples.
    ///
    /// The decay factor and the rolling estimate are kept; use
    /// [`reset_all`](Self::reset_all) to clear the rolling estimate too.
    pub fn reset(&self) {
        self.samples.clear();
        self.queries_since_prune.store(0, Ordering::Relaxed);
        debug!("Reset sample log");
    }

    /// Discard all recorded samples and zero the rolling estimate.
    pub fn reset_all(&self) {
        self.reset();
        self.rolling.store(0f64.to_bits(), Ordering::Release);
        debug!("Reset rolling estimate");
    }

    /// Blend an instantaneous rate into the rolling estimate and return the result.
    fn update_rolling(&self, instant: f64) -> f64 {
        let decay = self.decay_factor();
        let blend = |previous: f64| decay * previous + (1.0 - decay) * instant;

        let previous = match self
            .rolling
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some(blend(f64::from_bits(bits)).to_bits())
            }) {
            Ok(bits) | Err(bits) => bits,
        };

        blend(f64::from_bits(previous))
    }

    /// Every `prune_interval` queries, drop samples no longer needed.
    ///
    /// Everything older than the sample preceding the boundary goes, so the
    /// boundary keeps a predecessor and the same query still has enough data.
    /// A due prune waits for a scan whose boundary has a predecessor.
    fn maybe_prune(&self, scan: &WindowScan) {
        let queries = self.queries_since_prune.fetch_add(1, Ordering::Relaxed) + 1;
        if queries < self.prune_interval {
            return;
        }

        let Some(cutoff) = scan.boundary.and_then(|b| b.predecessor) else {
            return;
        };
        self.queries_since_prune.store(0, Ordering::Relaxed);

        let discarded = self.samples.prune_before(cutoff);
        if discarded > 0 {
            debug!(
                discarded,
                retained = self.samples.len(),
                "Discarded old samples"
            );
        }
    }
}

/// Samples inside the window per second of window.
fn count_samples(scan: &WindowScan, window: Duration) -> Option<f64> {
    // The very first sample closing the window does not count as full history.
    if !matches!(scan.boundary, Some(Boundary { index, .. }) if index > 0) {
        return None;
    }
    if scan.inside < MIN_SAMPLES_IN_WINDOW {
        return None;
    }
    Some(scan.inside as f64 / window.as_secs_f64())
}

/// Reciprocal of the mean spacing from the boundary sample to the newest one.
fn average_intervals(scan: &WindowScan) -> Option<f64> {
    let boundary = scan.boundary?;
    if scan.inside < MIN_SAMPLES_IN_WINDOW {
        return None;
    }

    let span = scan.youngest.saturating_duration_since(boundary.at);
    if span.is_zero() {
        return None;
    }
    Some(scan.inside as f64 / span.as_secs_f64())
}
