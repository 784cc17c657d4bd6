//! Storage for recorded sample timestamps.
//!
//! The log is append-only and ordered oldest to newest. It only ever shrinks
//! by dropping a prefix of old samples, or by being cleared entirely.

use parking_lot::Mutex;
use std::cell::RefCell;
use std::time::{Duration, Instant};

/// Result of walking the log backwards from the newest sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowScan {
    /// The newest recorded sample.
    pub youngest: Instant,
    /// Number of samples whose age is strictly below the window.
    pub inside: usize,
    /// The first sample, walking backwards, whose age reaches the window.
    /// `None` when the whole log lies inside the window.
    pub boundary: Option<Boundary>,
}

/// The sample that closes a window scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    /// Position of the sample in the log at scan time.
    pub index: usize,
    /// When the sample was recorded.
    pub at: Instant,
    /// The sample just before it, if any.
    pub predecessor: Option<Instant>,
}

/// A time-ordered log of sample timestamps.
///
/// Every method performs its own short, exclusive access to the log; no
/// access spans more than one call.
pub trait SampleLog {
    /// Append a sample. Returns the number of samples now held.
    fn push(&self, at: Instant) -> usize;

    /// Walk back from the newest sample until one is at least `window` old.
    ///
    /// Returns `None` when the log is empty.
    fn scan(&self, now: Instant, window: Duration) -> Option<WindowScan>;

    /// Drop every sample recorded strictly before `cutoff`.
    /// Returns the number of samples dropped.
    fn prune_before(&self, cutoff: Instant) -> usize;

    /// Drop every sample.
    fn clear(&self);

    /// Number of samples held.
    fn len(&self) -> usize;

    /// Whether the log holds no samples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn scan_samples(samples: &[Instant], now: Instant, window: Duration) -> Option<WindowScan> {
    let youngest = *samples.last()?;
    let mut inside = 0;

    for (index, &at) in samples.iter().enumerate().rev() {
        if now.saturating_duration_since(at) >= window {
            let predecessor = index.checked_sub(1).map(|i| samples[i]);
            return Some(WindowScan {
                youngest,
                inside,
                boundary: Some(Boundary {
                    index,
                    at,
                    predecessor,
                }),
            });
        }
        inside += 1;
    }

    Some(WindowScan {
        youngest,
        inside,
        boundary: None,
    })
}

fn prune_samples(samples: &mut Vec<Instant>, cutoff: Instant) -> usize {
    // Sorted ascending, so everything before the partition point is older.
    let stale = samples.partition_point(|&at| at < cutoff);
    samples.drain(..stale);
    stale
}

/// A sample log guarded by a mutex, shareable across threads.
#[derive(Debug, Default)]
pub struct LockedLog {
    samples: Mutex<Vec<Instant>>,
}

impl LockedLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SampleLog for LockedLog {
    fn push(&self, at: Instant) -> usize {
        let mut samples = self.samples.lock();
        samples.push(at);
        samples.len()
    }

    fn scan(&self, now: Instant, window: Duration) -> Option<WindowScan> {
        scan_samples(&self.samples.lock(), now, window)
    }

    fn prune_before(&self, cutoff: Instant) -> usize {
        prune_samples(&mut self.samples.lock(), cutoff)
    }

    fn clear(&self) {
        self.samples.lock().clear();
    }

    fn len(&self) -> usize {
        self.samples.lock().len()
    }
}

/// A sample log for single-threaded use. Not `Sync`.
#[derive(Debug, Default)]
pub struct LocalLog {
    samples: RefCell<Vec<Instant>>,
}

impl LocalLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SampleLog for LocalLog {
    fn push(&self, at: Instant) -> usize {
        let mut samples = self.samples.borrow_mut();
        samples.push(at);
        samples.len()
    }

    fn scan(&self, now: Instant, window: Duration) -> Option<WindowScan> {
        scan_samples(&self.samples.borrow(), now, window)
    }

    fn prune_before(&self, cutoff: Instant) -> usize {
        prune_samples(&mut self.samples.borrow_mut(), cutoff)
    }

    fn clear(&self) {
        self.samples.borrow_mut().clear();
    }

    fn len(&self) -> usize {
        self.samples.borrow().len()
    }
}
