use std::error::Error;
use std::fmt;

/// Unified error type for the ECG pipeline
#[derive(Debug)]
pub enum EcgError {
    /// Configuration-related errors (unknown sample rate, bad voltage range)
    Configuration(String),
    /// Data source unavailable or failed to initialize
    Source(String),
    /// File persistence errors
    Storage(String),
    /// TCP server errors
    Network(String),
    /// Timing/synchronization errors
    Timing(String),
}

impl fmt::Display for EcgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcgError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            EcgError::Source(msg) => write!(f, "Data source error: {}", msg),
            EcgError::Storage(msg) => write!(f, "Storage error: {}", msg),
            EcgError::Network(msg) => write!(f, "Network error: {}", msg),
            EcgError::Timing(msg) => write!(f, "Timing error: {}", msg),
        }
    }
}

impl Error for EcgError {}

impl From<std::io::Error> for EcgError {
    fn from(err: std::io::Error) -> Self {
        EcgError::Storage(err.to_string())
    }
}
