//! Shared utilities

pub mod time;

pub use time::{monotonic_micros, monotonic_nanos, MockTimeProvider, MonotonicTimeProvider, TimeProvider};
