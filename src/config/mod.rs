//! Pipeline configuration
//!
//! Plain value structs with compiled defaults; `validate` rejects options
//! the converter hardware cannot express before any thread starts.

pub mod constants;

use crate::error::EcgError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use constants::{detection, paths, signal, storage, timing};

/// Top-level configuration for one acquisition run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sampling rate in samples per second
    pub sample_rate_sps: u16,
    /// Converter full-scale range in volts
    pub voltage_range_v: f32,
    /// Total acquisition window
    pub acquisition_duration: Duration,
    /// Interval between file write batches
    pub write_interval: Duration,
    /// R-peak amplitude threshold in volts
    pub r_threshold_volts: f32,
    /// Capacity of the raw and classified ring buffers, in samples.
    /// `None` sizes them to hold the whole acquisition window.
    pub buffer_capacity: Option<usize>,
    /// Directory receiving the timestamped output files
    pub output_dir: PathBuf,
    /// Base name for the output file pair
    pub base_filename: String,
    /// TCP file server port; `None` disables the server
    pub tcp_port: Option<u16>,
    /// Log file path
    pub log_file: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate_sps: signal::DEFAULT_SAMPLE_RATE_SPS,
            voltage_range_v: signal::DEFAULT_VOLTAGE_RANGE_V,
            acquisition_duration: Duration::from_secs(timing::DEFAULT_ACQUISITION_DURATION_SECS),
            write_interval: storage::DEFAULT_WRITE_INTERVAL,
            r_threshold_volts: detection::DEFAULT_R_THRESHOLD_VOLTS,
            buffer_capacity: None,
            output_dir: PathBuf::from(storage::DEFAULT_OUTPUT_DIR),
            base_filename: storage::DEFAULT_BASE_FILENAME.to_string(),
            tcp_port: None,
            log_file: PathBuf::from(paths::DEFAULT_LOG_FILE),
        }
    }
}

impl PipelineConfig {
    /// Checks every option against what the converter supports.
    pub fn validate(&self) -> Result<(), EcgError> {
        if !signal::SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate_sps) {
            return Err(EcgError::Configuration(format!(
                "sample rate {} SPS not supported (options: {:?})",
                self.sample_rate_sps,
                signal::SUPPORTED_SAMPLE_RATES
            )));
        }
        if !signal::SUPPORTED_VOLTAGE_RANGES.contains(&self.voltage_range_v) {
            return Err(EcgError::Configuration(format!(
                "voltage range {} V not supported (options: {:?})",
                self.voltage_range_v,
                signal::SUPPORTED_VOLTAGE_RANGES
            )));
        }
        if self.acquisition_duration.is_zero() {
            return Err(EcgError::Configuration(
                "acquisition duration must be positive".to_string(),
            ));
        }
        if self.write_interval.is_zero() {
            return Err(EcgError::Configuration(
                "write interval must be positive".to_string(),
            ));
        }
        if let Some(capacity) = self.buffer_capacity {
            if capacity == 0 {
                return Err(EcgError::Configuration(
                    "buffer capacity must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Period of one sample at the configured rate
    pub fn sample_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.sample_rate_sps as f64)
    }

    /// Ring buffer capacity: explicit, or one full acquisition window
    pub fn effective_buffer_capacity(&self) -> usize {
        self.buffer_capacity.unwrap_or_else(|| {
            (self.sample_rate_sps as u64 * self.acquisition_duration.as_secs().max(1)) as usize
        })
    }

    fn window_samples(&self, seconds: f64) -> usize {
        (self.sample_rate_sps as f64 * seconds) as usize
    }

    pub fn qs_window(&self) -> usize {
        self.window_samples(detection::QS_WINDOW_SECONDS)
    }

    pub fn p_window(&self) -> usize {
        self.window_samples(detection::P_WINDOW_SECONDS)
    }

    pub fn t_window(&self) -> usize {
        self.window_samples(detection::T_WINDOW_SECONDS)
    }

    pub fn refractory(&self) -> usize {
        self.window_samples(detection::REFRACTORY_SECONDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unsupported_sample_rate_rejected() {
        let config = PipelineConfig {
            sample_rate_sps: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsupported_voltage_range_rejected() {
        let config = PipelineConfig {
            voltage_range_v: 5.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_windows_at_250_sps() {
        let config = PipelineConfig {
            sample_rate_sps: 250,
            ..Default::default()
        };
        assert_eq!(config.qs_window(), 20);
        assert_eq!(config.p_window(), 50);
        assert_eq!(config.t_window(), 100);
        assert_eq!(config.refractory(), 75);
    }

    #[test]
    fn test_buffer_capacity_defaults_to_full_window() {
        let config = PipelineConfig {
            sample_rate_sps: 250,
            acquisition_duration: Duration::from_secs(60),
            ..Default::default()
        };
        assert_eq!(config.effective_buffer_capacity(), 15_000);

        let explicit = PipelineConfig {
            buffer_capacity: Some(64),
            ..config
        };
        assert_eq!(explicit.effective_buffer_capacity(), 64);
    }
}
