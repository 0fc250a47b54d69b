// src/lib.rs
//! ECG Real-time Pipeline Library
//!
//! Continuous ECG acquisition, streaming PQRST landmark detection and
//! dual-format persistence for an embedded single-board computer with a
//! 16-bit converter attached.

pub mod acquisition;
pub mod application;
pub mod config;
mod error;
pub mod hal;
pub mod network;
pub mod processing;
pub mod storage;
pub mod utils;

// Re-export commonly used types

pub use acquisition::{run_acquisition, run_acquisition_with_clock, AcquisitionConfig, RingBuffer};
pub use utils::time::{MockTimeProvider, MonotonicTimeProvider, TimeProvider};
pub use application::Application;
pub use config::PipelineConfig;
pub use error::EcgError;
pub use hal::{FilePlayback, Sample, SampleSource, SyntheticEcg, SyntheticEcgConfig, WaveType};
pub use network::TcpFileServer;
pub use processing::{DetectorConfig, EcgAnalyzer, NotchFilter, WaveDetector};
pub use storage::FileWriter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config_round_trips_through_validation() {
        assert!(PipelineConfig::default().validate().is_ok());
    }
}
