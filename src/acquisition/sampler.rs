// src/acquisition/sampler.rs
//! Fixed-cadence acquisition loop
//!
//! Drives a [`SampleSource`] at the configured rate. Targets are computed
//! from the loop start so sleep jitter does not accumulate; when the loop
//! falls more than the resync threshold behind, the expected-sample index
//! is recomputed from real time instead of burst-reading to catch up.
//!
//! All timing goes through a [`TimeProvider`], so the loop runs against
//! the monotonic clock in production and a mock clock in tests.

use crate::acquisition::RingBuffer;
use crate::config::constants::timing;
use crate::hal::types::Sample;
use crate::hal::SampleSource;
use crate::utils::time::{MonotonicTimeProvider, TimeProvider};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Timing parameters for one acquisition run
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    pub sample_period: Duration,
    pub duration: Duration,
}

/// Runs the acquisition loop to completion on the calling thread, against
/// the process monotonic clock.
pub fn run_acquisition(
    source: Box<dyn SampleSource>,
    buffer: Arc<RingBuffer<Sample>>,
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    config: AcquisitionConfig,
) {
    run_acquisition_with_clock(source, buffer, running, shutdown, config, &MonotonicTimeProvider);
}

/// Clock-injected variant of [`run_acquisition`].
///
/// Exits when the duration elapses, the run flag clears, shutdown is
/// requested, or the source runs dry. On exit the run flag is cleared and
/// the raw buffer is shut down, releasing the analyzer's blocked consume.
pub fn run_acquisition_with_clock(
    mut source: Box<dyn SampleSource>,
    buffer: Arc<RingBuffer<Sample>>,
    running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    config: AcquisitionConfig,
    clock: &dyn TimeProvider,
) {
    info!(
        "Starting acquisition for {:.1} s at {:.0} SPS",
        config.duration.as_secs_f64(),
        1.0 / config.sample_period.as_secs_f64()
    );

    let start_nanos = clock.now_nanos();
    let end_nanos = start_nanos + config.duration.as_nanos() as u64;
    let period_nanos = config.sample_period.as_secs_f64() * 1e9;
    let samples_per_second = (1e9 / period_nanos).round().max(1.0) as u64;
    let resync_threshold_nanos = timing::RESYNC_THRESHOLD.as_nanos() as u64;
    let warn_interval_nanos = timing::RESYNC_WARN_INTERVAL.as_nanos() as u64;

    let mut expected_sample: u64 = 0;
    let mut collected: u64 = 0;
    let mut last_resync_warn: Option<u64> = None;

    while running.load(Ordering::Acquire)
        && !shutdown.load(Ordering::Acquire)
        && clock.now_nanos() < end_nanos
    {
        expected_sample += 1;
        let target_nanos = start_nanos + (expected_sample as f64 * period_nanos) as u64;
        clock.sleep_until_nanos(target_nanos);

        if !running.load(Ordering::Acquire) || shutdown.load(Ordering::Acquire) {
            break;
        }

        if !source.available() {
            info!("Data source exhausted, ending acquisition early");
            break;
        }

        let Some(voltage) = source.read_voltage() else {
            warn!("Failed to read voltage, skipping sample");
            continue;
        };

        buffer.push(Sample::new(voltage, clock.now_nanos()));

        collected += 1;
        if collected % samples_per_second == 0 {
            debug!("Samples collected: {}", collected);
        }

        // Resynchronize when the cadence slipped past the threshold
        let now_nanos = clock.now_nanos();
        let delay_nanos = now_nanos.saturating_sub(target_nanos);
        if delay_nanos > resync_threshold_nanos {
            expected_sample = ((now_nanos - start_nanos) as f64 / period_nanos) as u64;

            let warn_due =
                last_resync_warn.map_or(true, |t| now_nanos - t >= warn_interval_nanos);
            if warn_due {
                warn!(
                    "High acquisition delay: {} us, resynchronizing cadence",
                    delay_nanos / 1000
                );
                last_resync_warn = Some(now_nanos);
            }
        }
    }

    info!("Acquisition finished after {} samples", collected);

    running.store(false, Ordering::Release);
    buffer.shutdown();

    info!("Acquisition loop exited, signaled shutdown to processing stage");
}
