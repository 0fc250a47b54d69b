//! Optional signal conditioning applied before landmark detection

pub mod notch;

pub use notch::NotchFilter;

/// Filter construction errors
#[derive(Debug, PartialEq)]
pub enum FilterError {
    InvalidParameters(String),
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::InvalidParameters(msg) => write!(f, "Invalid filter parameters: {}", msg),
        }
    }
}

impl std::error::Error for FilterError {}
