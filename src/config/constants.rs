// src/config/constants.rs
//! System-wide configuration constants

/// Signal and converter constants
pub mod signal {
    /// Sample rates supported by the ADS1115 converter (SPS)
    pub const SUPPORTED_SAMPLE_RATES: &[u16] = &[8, 16, 32, 64, 128, 250, 475, 860];
    pub const DEFAULT_SAMPLE_RATE_SPS: u16 = 475;

    /// Full-scale voltage ranges supported by the converter's PGA (volts)
    pub const SUPPORTED_VOLTAGE_RANGES: &[f32] = &[6.144, 4.096, 2.048, 1.024, 0.512, 0.256];
    pub const DEFAULT_VOLTAGE_RANGE_V: f32 = 4.096;

    /// Scale factor between raw 16-bit readings and the full-scale range
    pub const ADC_SCALE: f32 = 32768.0;
}

/// Waveform detection constants
pub mod detection {
    /// Q/S search window on each side of an R peak (seconds)
    pub const QS_WINDOW_SECONDS: f64 = 0.080;

    /// P-wave search window before the Q point (seconds)
    pub const P_WINDOW_SECONDS: f64 = 0.200;

    /// T-wave search window after the S point (seconds)
    pub const T_WINDOW_SECONDS: f64 = 0.400;

    /// Minimum spacing between consecutive R detections (seconds)
    pub const REFRACTORY_SECONDS: f64 = 0.300;

    /// Amplitude an R peak must exceed (volts, non-adaptive)
    pub const DEFAULT_R_THRESHOLD_VOLTS: f32 = 2.5;
}

/// Acquisition timing constants
pub mod timing {
    use std::time::Duration;

    /// Delay past the cadence target that triggers a resynchronization
    pub const RESYNC_THRESHOLD: Duration = Duration::from_millis(10);

    /// Minimum spacing between resync warnings
    pub const RESYNC_WARN_INTERVAL: Duration = Duration::from_secs(1);

    pub const DEFAULT_ACQUISITION_DURATION_SECS: u64 = 60;
}

/// Persistence constants
pub mod storage {
    use std::time::Duration;

    pub const DEFAULT_WRITE_INTERVAL: Duration = Duration::from_millis(200);

    /// Samples drained from the classified buffer per write tick
    pub const WRITE_BATCH_SIZE: usize = 100;

    /// Fixed size of one binary record: i16 raw voltage + i64 timestamp
    pub const BINARY_RECORD_BYTES: usize = 10;

    pub const CSV_HEADER: &[&str] = &["timestamp_us", "voltage", "classification"];

    pub const DEFAULT_OUTPUT_DIR: &str = "data/processed";
    pub const DEFAULT_BASE_FILENAME: &str = "ecg_data";
}

/// File transfer server constants
pub mod network {
    use std::time::Duration;

    pub const DEFAULT_PORT: u16 = 8080;

    /// Accept-poll tick; also bounds how long `stop` waits for the thread
    pub const ACCEPT_TICK: Duration = Duration::from_secs(1);

    /// File payload chunk size on the wire
    pub const SEND_CHUNK_BYTES: usize = 8192;
}

/// Filesystem defaults
pub mod paths {
    pub const DEFAULT_INPUT_FILE: &str = "data/ecg_samples.bin";
    pub const DEFAULT_LOG_FILE: &str = "system.log";
}
