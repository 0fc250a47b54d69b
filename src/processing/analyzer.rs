// src/processing/analyzer.rs
//! Analyzer stage: worker thread between the raw and classified buffers
//!
//! Blocks on the raw buffer, runs every sample through the streaming
//! detector (optionally behind a notch pre-filter) and pushes classified
//! samples downstream. On shutdown it drains whatever the raw buffer still
//! holds, flushes the detector window and closes the classified buffer.

use crate::acquisition::RingBuffer;
use crate::hal::types::Sample;
use crate::processing::detector::{DetectorConfig, WaveDetector};
use crate::processing::filters::NotchFilter;
use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// PQRST analyzer running on its own thread
pub struct EcgAnalyzer {
    buffer_raw: Arc<RingBuffer<Sample>>,
    buffer_classified: Arc<RingBuffer<Sample>>,
    detector_config: DetectorConfig,
    notch: Option<NotchFilter>,
    processing: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EcgAnalyzer {
    pub fn new(
        buffer_raw: Arc<RingBuffer<Sample>>,
        buffer_classified: Arc<RingBuffer<Sample>>,
        detector_config: DetectorConfig,
    ) -> Self {
        Self {
            buffer_raw,
            buffer_classified,
            detector_config,
            notch: None,
            processing: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Installs a notch pre-filter applied to every voltage before
    /// detection.
    pub fn with_notch_filter(mut self, filter: NotchFilter) -> Self {
        self.notch = Some(filter);
        self
    }

    /// Spawns the processing thread.
    pub fn run(&mut self) {
        if self.handle.is_some() {
            return;
        }
        self.processing.store(true, Ordering::Release);

        let buffer_raw = self.buffer_raw.clone();
        let buffer_classified = self.buffer_classified.clone();
        let detector = WaveDetector::new(self.detector_config.clone());
        let notch = self.notch.take();
        let processing = self.processing.clone();

        self.handle = Some(std::thread::spawn(move || {
            processing_loop(buffer_raw, buffer_classified, detector, notch, processing);
        }));
    }

    /// Stops the thread, letting it drain the raw buffer first. Idempotent.
    pub fn stop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        info!("Stopping ECG processing thread...");

        self.processing.store(false, Ordering::Release);
        self.buffer_raw.shutdown();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("ECG processing thread terminated with a panic");
            }
        }
        info!("ECG processing stopped");
    }
}

fn processing_loop(
    buffer_raw: Arc<RingBuffer<Sample>>,
    buffer_classified: Arc<RingBuffer<Sample>>,
    mut detector: WaveDetector,
    mut notch: Option<NotchFilter>,
    processing: Arc<AtomicBool>,
) {
    info!("Starting ECG processing thread...");

    let mut process_one = |sample: Sample, detector: &mut WaveDetector| {
        let sample = match notch.as_mut() {
            Some(filter) => Sample {
                voltage: filter.process_sample(sample.voltage),
                ..sample
            },
            None => sample,
        };
        detector.process_sample(sample, &mut |classified| buffer_classified.push(classified));
    };

    while processing.load(Ordering::Acquire) {
        match buffer_raw.consume() {
            Some(sample) => process_one(sample, &mut detector),
            None => {
                info!("Processing interrupted - buffer shutdown");
                break;
            }
        }
    }

    info!("Processing remaining samples in buffer...");
    while let Some(sample) = buffer_raw.try_consume() {
        process_one(sample, &mut detector);
    }

    detector.finalize(&mut |classified| buffer_classified.push(classified));

    buffer_classified.shutdown();
    info!(
        "Processing thread finished. Total beats detected: {}",
        detector.beats_detected()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::synthetic::cycle_template;
    use crate::hal::types::WaveType;

    fn detector_config() -> DetectorConfig {
        DetectorConfig {
            qs_window: 20,
            p_window: 50,
            t_window: 100,
            refractory: 75,
            r_threshold: 2.5,
        }
    }

    #[test]
    fn test_analyzer_classifies_stream_end_to_end() {
        let buffer_raw = Arc::new(RingBuffer::new(4096));
        let buffer_classified = Arc::new(RingBuffer::new(4096));
        let mut analyzer = EcgAnalyzer::new(
            buffer_raw.clone(),
            buffer_classified.clone(),
            detector_config(),
        );
        analyzer.run();

        let trace = cycle_template(250, 1000, 3.0);
        for (i, &voltage) in trace.iter().enumerate() {
            buffer_raw.push(Sample::new(voltage, (i as u64) * 4_000_000));
        }
        analyzer.stop();

        let mut emitted = Vec::new();
        while let Some(sample) = buffer_classified.try_consume() {
            emitted.push(sample);
        }
        assert!(buffer_classified.is_shutdown());

        assert_eq!(emitted.len(), trace.len());
        let r_count = emitted
            .iter()
            .filter(|s| s.classification == WaveType::R)
            .count();
        assert_eq!(r_count, 1);

        for pair in emitted.windows(2) {
            assert!(pair[0].timestamp_ns < pair[1].timestamp_ns);
        }
    }

    #[test]
    fn test_stop_is_idempotent() {
        let buffer_raw = Arc::new(RingBuffer::<Sample>::new(16));
        let buffer_classified = Arc::new(RingBuffer::new(16));
        let mut analyzer =
            EcgAnalyzer::new(buffer_raw, buffer_classified.clone(), detector_config());

        analyzer.run();
        analyzer.stop();
        analyzer.stop();
        assert!(buffer_classified.is_shutdown());
    }
}
