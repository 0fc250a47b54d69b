// src/hal/types.rs
//! Core types shared across the acquisition pipeline

use serde::{Deserialize, Serialize};

/// Cardiac waveform landmark classification for a single sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveType {
    Normal,
    P,
    Q,
    R,
    S,
    T,
}

impl WaveType {
    /// Single-letter code used in the CSV output
    pub fn as_char(self) -> char {
        match self {
            WaveType::Normal => 'N',
            WaveType::P => 'P',
            WaveType::Q => 'Q',
            WaveType::R => 'R',
            WaveType::S => 'S',
            WaveType::T => 'T',
        }
    }
}

impl Default for WaveType {
    fn default() -> Self {
        Self::Normal
    }
}

impl std::fmt::Display for WaveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Single ECG measurement flowing through the pipeline.
///
/// Samples are plain values; stages copy them freely. The timestamp is
/// nanoseconds on the process monotonic clock, captured when the sample
/// enters the pipeline. The classification defaults to `Normal` and is set
/// at most once by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub voltage: f32,
    pub timestamp_ns: u64,
    pub classification: WaveType,
}

impl Sample {
    pub fn new(voltage: f32, timestamp_ns: u64) -> Self {
        Self {
            voltage,
            timestamp_ns,
            classification: WaveType::Normal,
        }
    }

    pub fn timestamp_us(&self) -> u64 {
        self.timestamp_ns / 1000
    }
}

/// Converts a raw 16-bit ADC reading to volts for the given full-scale range.
pub fn raw_to_volts(raw: i16, voltage_range: f32) -> f32 {
    raw as f32 * voltage_range / 32768.0
}

/// Converts volts back to a raw 16-bit reading, clamped to the i16 range.
pub fn volts_to_raw(voltage: f32, voltage_range: f32) -> i16 {
    let scaled = voltage * 32768.0 / voltage_range;
    scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
