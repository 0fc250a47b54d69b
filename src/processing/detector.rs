// src/processing/detector.rs
//! Streaming PQRST landmark detection
//!
//! Single-pass, sample-by-sample detection over a rolling window. R peaks
//! are found with one sample of lag; Q/S, P and T resolve later as enough
//! look-back/look-ahead accumulates. Samples leave the detector in arrival
//! order once no future detection can still classify them.
//!
//! The window is trimmed as samples are handed off. Positions are kept as
//! absolute stream indices with a `base` offset recording how many samples
//! have been dropped, so beat records never need rebasing.

use crate::config::PipelineConfig;
use crate::hal::types::{Sample, WaveType};

/// Detection parameters in samples, derived from the sampling rate
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub qs_window: usize,
    pub p_window: usize,
    pub t_window: usize,
    pub refractory: usize,
    pub r_threshold: f32,
}

impl DetectorConfig {
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            qs_window: config.qs_window().max(1),
            p_window: config.p_window().max(1),
            t_window: config.t_window().max(1),
            refractory: config.refractory().max(1),
            r_threshold: config.r_threshold_volts,
        }
    }
}

/// Working record for one detected cardiac cycle.
///
/// Positions are absolute stream indices. `q_pos`/`s_pos` are meaningful
/// once `qrs_complete` is set, `p_pos` once `p_complete`, `t_pos` once
/// `t_complete`.
#[derive(Debug, Clone)]
pub struct Beat {
    pub r_pos: usize,
    pub q_pos: usize,
    pub s_pos: usize,
    pub p_pos: usize,
    pub t_pos: usize,
    pub qrs_complete: bool,
    pub p_complete: bool,
    pub t_complete: bool,
}

impl Beat {
    fn new(r_pos: usize) -> Self {
        Self {
            r_pos,
            q_pos: 0,
            s_pos: 0,
            p_pos: 0,
            t_pos: 0,
            qrs_complete: false,
            p_complete: false,
            t_complete: false,
        }
    }
}

/// Streaming detector state
pub struct WaveDetector {
    config: DetectorConfig,
    /// Retained window; absolute index `i` lives at `samples[i - base]`
    samples: Vec<Sample>,
    /// Count of samples trimmed off the front of the window
    base: usize,
    beats: Vec<Beat>,
    /// Absolute index up to which samples have been handed off
    last_transferred: usize,
    beats_detected: u64,
}

impl WaveDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            // Room for the retained tail plus the untransferred span
            samples: Vec::with_capacity(2 * config.t_window + 2),
            config,
            base: 0,
            beats: Vec::with_capacity(8),
            last_transferred: 0,
            beats_detected: 0,
        }
    }

    /// Total samples ever pushed
    fn stream_len(&self) -> usize {
        self.base + self.samples.len()
    }

    fn voltage(&self, pos: usize) -> f32 {
        self.samples[pos - self.base].voltage
    }

    /// Feeds one sample; classified samples that can no longer change are
    /// passed to `emit` in arrival order.
    pub fn process_sample<F: FnMut(Sample)>(&mut self, sample: Sample, emit: &mut F) {
        self.samples.push(sample);

        if self.samples.len() >= 3 {
            self.detect_r_peak();
        }

        self.complete_pending_beats();
        self.transfer_ready_samples(emit);
    }

    /// Flushes everything still held, regardless of look-ahead margin.
    /// Called once when the input stream ends.
    pub fn finalize<F: FnMut(Sample)>(&mut self, emit: &mut F) {
        self.complete_pending_beats();
        self.apply_classifications();

        let stream_len = self.stream_len();
        assert!(
            self.last_transferred >= self.base && self.last_transferred <= stream_len,
            "transfer cursor {} outside window [{}, {}]",
            self.last_transferred,
            self.base,
            stream_len
        );

        for pos in self.last_transferred..stream_len {
            emit(self.samples[pos - self.base]);
        }
        self.last_transferred = stream_len;
    }

    pub fn beats_detected(&self) -> u64 {
        self.beats_detected
    }

    /// Beats with every landmark resolved
    pub fn complete_beats(&self) -> usize {
        self.beats
            .iter()
            .filter(|b| b.qrs_complete && b.p_complete && b.t_complete)
            .count()
    }

    #[cfg(test)]
    fn window_len(&self) -> usize {
        self.samples.len()
    }

    fn detect_r_peak(&mut self) {
        // One sample of lag so both neighbors exist
        let check_pos = self.stream_len() - 2;

        if self.is_r_peak(check_pos) {
            if let Some(last) = self.beats.last() {
                assert!(
                    check_pos > last.r_pos,
                    "R positions must be strictly increasing ({} after {})",
                    check_pos,
                    last.r_pos
                );
            }
            self.beats.push(Beat::new(check_pos));
            self.beats_detected += 1;
            log::debug!("R peak detected at stream position {}", check_pos);
        }
    }

    fn is_r_peak(&self, pos: usize) -> bool {
        let prev = self.voltage(pos - 1);
        let curr = self.voltage(pos);
        let next = self.voltage(pos + 1);

        // Strictly higher than both neighbors and above threshold
        let is_peak = curr > prev && curr > next && curr > self.config.r_threshold;

        if is_peak {
            if let Some(last) = self.beats.last() {
                if pos - last.r_pos < self.config.refractory {
                    return false;
                }
            }
        }
        is_peak
    }

    fn complete_pending_beats(&mut self) {
        let stream_len = self.stream_len();

        for i in 0..self.beats.len() {
            let beat = &self.beats[i];
            let r_pos = beat.r_pos;

            // Q and S: window extrema on each side of R
            if !beat.qrs_complete
                && r_pos >= self.config.qs_window
                && r_pos + self.config.qs_window < stream_len
            {
                let q_pos = self.argmin(r_pos - self.config.qs_window, r_pos);
                let s_pos = self.argmin(r_pos + 1, r_pos + self.config.qs_window + 1);

                let beat = &mut self.beats[i];
                beat.q_pos = q_pos;
                beat.s_pos = s_pos;
                beat.qrs_complete = true;
                log::debug!("QRS complex resolved for beat at {}", r_pos);
            }

            // P: highest value in the window before Q
            let beat = &self.beats[i];
            if beat.qrs_complete && !beat.p_complete && beat.q_pos >= self.config.p_window {
                let p_pos = self.argmax(beat.q_pos - self.config.p_window, beat.q_pos);
                let beat = &mut self.beats[i];
                beat.p_pos = p_pos;
                beat.p_complete = true;
            }

            // T: highest value in the window after S
            let beat = &self.beats[i];
            if beat.qrs_complete
                && !beat.t_complete
                && beat.s_pos + self.config.t_window < stream_len
            {
                let t_pos = self.argmax(beat.s_pos + 1, beat.s_pos + self.config.t_window + 1);
                let beat = &mut self.beats[i];
                beat.t_pos = t_pos;
                beat.t_complete = true;
            }
        }
    }

    /// Earliest index of the minimum over absolute range `[start, end)`
    fn argmin(&self, start: usize, end: usize) -> usize {
        self.extremum(start, end, |candidate, best| candidate < best)
    }

    /// Earliest index of the maximum over absolute range `[start, end)`
    fn argmax(&self, start: usize, end: usize) -> usize {
        self.extremum(start, end, |candidate, best| candidate > best)
    }

    fn extremum(&self, start: usize, end: usize, better: impl Fn(f32, f32) -> bool) -> usize {
        assert!(
            start >= self.base && end <= self.stream_len() && start < end,
            "search range [{}, {}) outside window [{}, {})",
            start,
            end,
            self.base,
            self.stream_len()
        );

        let mut best_pos = start;
        let mut best_value = self.voltage(start);
        for pos in (start + 1)..end {
            let value = self.voltage(pos);
            if better(value, best_value) {
                best_value = value;
                best_pos = pos;
            }
        }
        best_pos
    }

    fn mark(&mut self, pos: usize, wave: WaveType) {
        // Positions behind the window were marked before they were emitted
        if pos >= self.base && pos < self.stream_len() {
            self.samples[pos - self.base].classification = wave;
        }
    }

    fn apply_classifications(&mut self) {
        for i in 0..self.beats.len() {
            let beat = self.beats[i].clone();

            self.mark(beat.r_pos, WaveType::R);
            if beat.qrs_complete {
                self.mark(beat.q_pos, WaveType::Q);
                self.mark(beat.s_pos, WaveType::S);
            }
            if beat.p_complete {
                self.mark(beat.p_pos, WaveType::P);
            }
            if beat.t_complete {
                self.mark(beat.t_pos, WaveType::T);
            }
        }
    }

    fn transfer_ready_samples<F: FnMut(Sample)>(&mut self, emit: &mut F) {
        let stream_len = self.stream_len();
        if stream_len <= self.config.t_window {
            return;
        }

        // Younger samples could still be rewritten by a T detection
        let safe = stream_len - self.config.t_window;
        if safe <= self.last_transferred {
            return;
        }

        self.apply_classifications();

        assert!(
            self.last_transferred >= self.base,
            "transfer cursor {} behind window base {}",
            self.last_transferred,
            self.base
        );
        for pos in self.last_transferred..safe {
            emit(self.samples[pos - self.base]);
        }
        self.last_transferred = safe;

        // Trim the window down to the last t_window handed-off samples
        let local_cursor = self.last_transferred - self.base;
        if local_cursor > self.config.t_window {
            let remove = local_cursor - self.config.t_window;
            self.samples.drain(..remove);
            self.base += remove;

            // Beats behind the cut are either fully resolved or can never
            // resolve; the refractory guard is unaffected because the
            // refractory span fits inside the retained t_window.
            let base = self.base;
            self.beats.retain(|beat| beat.r_pos >= base);
        }
    }
}
