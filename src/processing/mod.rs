//! Streaming ECG analysis
//!
//! [`detector`] holds the single-threaded PQRST algorithm; [`analyzer`]
//! wraps it in the pipeline's worker thread; [`filters`] provides the
//! optional notch pre-stage.

pub mod analyzer;
pub mod detector;
pub mod filters;

pub use analyzer::EcgAnalyzer;
pub use detector::{Beat, DetectorConfig, WaveDetector};
pub use filters::NotchFilter;
