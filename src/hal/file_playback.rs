// src/hal/file_playback.rs
//! Binary-file playback source
//!
//! Replays a recording produced by the file writer (or any file of the
//! same fixed 10-byte record format). The whole file is decoded into
//! memory at construction; reads then just walk the sample vector.

use crate::error::EcgError;
use crate::hal::types::raw_to_volts;
use crate::hal::SampleSource;
use log::{info, warn};
use std::fs;
use std::path::Path;

/// Sample source backed by a recorded binary file.
///
/// Recorded timestamps are dropped during decoding: the acquisition loop
/// is the timing authority, so playback only supplies voltages.
pub struct FilePlayback {
    samples: Vec<f32>,
    current_index: usize,
    loop_playback: bool,
}

impl FilePlayback {
    /// Loads `path`, converting each raw reading with the given full-scale
    /// voltage range.
    pub fn new<P: AsRef<Path>>(
        path: P,
        voltage_range: f32,
        loop_playback: bool,
    ) -> Result<Self, EcgError> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|e| EcgError::Source(format!("failed to read {}: {}", path.display(), e)))?;

        let samples = Self::decode(&bytes, voltage_range);
        if samples.is_empty() {
            return Err(EcgError::Source(format!(
                "no samples found in {}",
                path.display()
            )));
        }

        if bytes.len() % 10 != 0 {
            warn!(
                "{}: {} trailing bytes ignored (incomplete record)",
                path.display(),
                bytes.len() % 10
            );
        }
        info!("Loaded {} samples from {}", samples.len(), path.display());

        Ok(Self {
            samples,
            current_index: 0,
            loop_playback,
        })
    }

    fn decode(bytes: &[u8], voltage_range: f32) -> Vec<f32> {
        bytes
            .chunks_exact(10)
            .map(|record| {
                let raw = i16::from_le_bytes([record[0], record[1]]);
                raw_to_volts(raw, voltage_range)
            })
            .collect()
    }

    pub fn total_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn set_loop_playback(&mut self, loop_playback: bool) {
        self.loop_playback = loop_playback;
    }

    /// Rewinds playback to the first sample.
    pub fn rewind(&mut self) {
        self.current_index = 0;
    }
}

impl SampleSource for FilePlayback {
    fn read_voltage(&mut self) -> Option<f32> {
        if self.current_index >= self.samples.len() {
            if !self.loop_playback {
                return None;
            }
            self.current_index = 0;
        }

        let voltage = self.samples[self.current_index];
        self.current_index += 1;
        Some(voltage)
    }

    fn available(&self) -> bool {
        self.loop_playback || self.current_index < self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_records(records: &[(i16, i64)]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for &(raw, timestamp_us) in records {
            file.write_all(&raw.to_le_bytes()).unwrap();
            file.write_all(&timestamp_us.to_le_bytes()).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_decodes_and_converts_records() {
        let file = write_records(&[(1000, 0), (2000, 4000), (-1000, 8000)]);
        let mut source = FilePlayback::new(file.path(), 4.096, false).unwrap();

        assert_eq!(source.total_samples(), 3);
        assert!(source.available());
        assert!((source.read_voltage().unwrap() - 0.125).abs() < 1e-4);
        assert!((source.read_voltage().unwrap() - 0.250).abs() < 1e-4);
        assert!((source.read_voltage().unwrap() + 0.125).abs() < 1e-4);
    }

    #[test]
    fn test_end_of_stream_without_loop() {
        let file = write_records(&[(100, 0)]);
        let mut source = FilePlayback::new(file.path(), 4.096, false).unwrap();

        assert!(source.read_voltage().is_some());
        assert!(source.read_voltage().is_none());
        assert!(!source.available());
    }

    #[test]
    fn test_loop_playback_wraps() {
        let file = write_records(&[(100, 0), (200, 4000)]);
        let mut source = FilePlayback::new(file.path(), 4.096, true).unwrap();

        for _ in 0..5 {
            assert!(source.read_voltage().is_some());
        }
        assert!(source.available());
    }

    #[test]
    fn test_empty_file_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(FilePlayback::new(file.path(), 4.096, false).is_err());
    }

    #[test]
    fn test_missing_file_rejected() {
        assert!(FilePlayback::new("does/not/exist.bin", 4.096, false).is_err());
    }
}
