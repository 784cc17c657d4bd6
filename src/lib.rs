//! Ratewatch - Sliding-Window Event Rate Estimation
//!
//! This crate estimates how often a stream of discrete events is currently
//! occurring (for example, frames per second in a render loop). Events are
//! recorded as monotonic timestamps; queries compute a rate over a trailing
//! time window, optionally smoothed by an exponential rolling average.

pub mod config;
pub mod error;
pub mod estimator;
