use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Time provider trait for dependency injection and testing
pub trait TimeProvider: Send + Sync {
    fn now_nanos(&self) -> u64;

    fn now_micros(&self) -> u64 {
        self.now_nanos() / 1000
    }

    /// Blocks until the clock reads at least `deadline_nanos`.
    fn sleep_until_nanos(&self, deadline_nanos: u64);
}

/// Monotonic time provider backed by the process-wide clock anchor
pub struct MonotonicTimeProvider;

impl TimeProvider for MonotonicTimeProvider {
    fn now_nanos(&self) -> u64 {
        monotonic_nanos()
    }

    fn sleep_until_nanos(&self, deadline_nanos: u64) {
        let deadline = clock_anchor() + Duration::from_nanos(deadline_nanos);
        std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
    }
}

/// Mock time provider for deterministic testing
pub struct MockTimeProvider {
    current_time: AtomicU64,
}

impl MockTimeProvider {
    pub fn new(initial_time_nanos: u64) -> Self {
        Self {
            current_time: AtomicU64::new(initial_time_nanos),
        }
    }

    pub fn advance_by(&self, nanos: u64) {
        self.current_time.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn set_time(&self, nanos: u64) {
        self.current_time.store(nanos, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.current_time.load(Ordering::Relaxed)
    }

    fn sleep_until_nanos(&self, deadline_nanos: u64) {
        // Jumps straight to the deadline; mock sleeps never block a test
        self.current_time.fetch_max(deadline_nanos, Ordering::Relaxed);
    }
}

static CLOCK_ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Anchor of the process-wide monotonic clock. The first caller pins it;
/// every sample timestamp in the pipeline is measured from this point.
pub fn clock_anchor() -> Instant {
    *CLOCK_ANCHOR.get_or_init(Instant::now)
}

/// Nanoseconds elapsed on the monotonic clock since the process anchor.
pub fn monotonic_nanos() -> u64 {
    clock_anchor().elapsed().as_nanos() as u64
}

pub fn monotonic_micros() -> u64 {
    monotonic_nanos() / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_never_decreases() {
        let a = monotonic_nanos();
        let b = monotonic_nanos();
        assert!(b >= a);
    }

    #[test]
    fn test_anchor_is_stable() {
        assert_eq!(clock_anchor(), clock_anchor());
    }

    #[test]
    fn test_mock_provider_advances() {
        let clock = MockTimeProvider::new(1_000);
        assert_eq!(clock.now_nanos(), 1_000);
        clock.advance_by(500);
        assert_eq!(clock.now_nanos(), 1_500);
        clock.set_time(10_000);
        assert_eq!(clock.now_micros(), 10);
    }

    #[test]
    fn test_mock_sleep_jumps_to_deadline() {
        let clock = MockTimeProvider::new(0);
        clock.sleep_until_nanos(4_000_000);
        assert_eq!(clock.now_nanos(), 4_000_000);

        // A deadline in the past never rewinds the clock
        clock.sleep_until_nanos(1_000_000);
        assert_eq!(clock.now_nanos(), 4_000_000);
    }

    #[test]
    fn test_monotonic_provider_tracks_anchor() {
        let clock = MonotonicTimeProvider;
        let a = clock.now_nanos();
        let b = monotonic_nanos();
        assert!(b >= a);
    }
}
