//! Event rate estimation over a trailing time window.

mod clock;
mod samples;
mod method;
mod rate;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use samples::{Boundary, LocalLog, LockedLog, SampleLog, WindowScan};
pub use method::EstimationMethod;
pub use rate::{RateEstimator, DEFAULT_PRUNE_INTERVAL, INSUFFICIENT_DATA};
