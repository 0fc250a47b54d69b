//! Data source abstraction for the acquisition pipeline
//!
//! Every voltage producer (hardware converter, file playback, synthetic
//! generator) implements [`SampleSource`]. Sources only deliver values;
//! the acquisition loop is the timing authority.

pub mod file_playback;
pub mod synthetic;
pub mod types;

pub use file_playback::FilePlayback;
pub use synthetic::{SyntheticEcg, SyntheticEcgConfig};
pub use types::{raw_to_volts, volts_to_raw, Sample, WaveType};

/// Interface every ECG data source must satisfy
pub trait SampleSource: Send {
    /// Produces the next voltage in volts.
    ///
    /// `None` signals either a transient read failure (the caller skips the
    /// cadence slot and continues) or end of stream, in which case
    /// [`available`](Self::available) turns false.
    fn read_voltage(&mut self) -> Option<f32>;

    /// Whether the source is initialized and has data left to deliver.
    fn available(&self) -> bool;
}
