// src/storage/file_writer.rs
//! Periodic dual-format persistence of the classified stream
//!
//! Drains the classified buffer in batches on a fixed interval and writes
//! every sample to a binary file (fixed 10-byte records) and a CSV file.
//! The two files always contain the same samples in the same order. A
//! stream that fails non-recoverably is closed and writing continues on
//! the other.

use crate::acquisition::RingBuffer;
use crate::config::constants::storage;
use crate::error::EcgError;
use crate::hal::types::{volts_to_raw, Sample};
use log::{error, info, warn};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Writer stage draining the classified buffer to disk
pub struct FileWriter {
    write_interval: Duration,
    bin_path: PathBuf,
    csv_path: PathBuf,
    state: Option<WriterState>,
    writing: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

struct WriterState {
    buffer: Arc<RingBuffer<Sample>>,
    bin_stream: Option<BufWriter<File>>,
    csv_stream: Option<csv::Writer<File>>,
    voltage_range: f32,
    first_timestamp_us: Option<u64>,
    samples_written: u64,
    bytes_written: u64,
}

impl FileWriter {
    /// Prepares a writer for a timestamped file pair under `output_dir`.
    /// No files are touched until [`init`](Self::init).
    pub fn new(
        buffer: Arc<RingBuffer<Sample>>,
        output_dir: &Path,
        base_filename: &str,
        write_interval: Duration,
        voltage_range: f32,
    ) -> Self {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let bin_path = output_dir.join(format!("{}_{}.bin", base_filename, timestamp));
        let csv_path = output_dir.join(format!("{}_{}.csv", base_filename, timestamp));

        Self {
            state: Some(WriterState {
                buffer,
                bin_stream: None,
                csv_stream: None,
                voltage_range,
                first_timestamp_us: None,
                samples_written: 0,
                bytes_written: 0,
            }),
            write_interval,
            bin_path,
            csv_path,
            writing: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Creates the output directory, opens both files and writes the CSV
    /// header. Failure of either file fails the whole init.
    pub fn init(&mut self) -> Result<(), EcgError> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| EcgError::Storage("writer already running".to_string()))?;

        let dir = self.bin_path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .map_err(|e| EcgError::Storage(format!("failed to create {}: {}", dir.display(), e)))?;

        info!(
            "Initializing file writer: {} {}",
            self.bin_path.display(),
            self.csv_path.display()
        );

        let bin_file = File::create(&self.bin_path).map_err(|e| {
            EcgError::Storage(format!("failed to open {}: {}", self.bin_path.display(), e))
        })?;
        state.bin_stream = Some(BufWriter::new(bin_file));

        let csv_file = File::create(&self.csv_path).map_err(|e| {
            EcgError::Storage(format!("failed to open {}: {}", self.csv_path.display(), e))
        })?;
        let mut csv_stream = csv::Writer::from_writer(csv_file);
        csv_stream
            .write_record(storage::CSV_HEADER)
            .and_then(|_| csv_stream.flush().map_err(Into::into))
            .map_err(|e| EcgError::Storage(format!("failed to write CSV header: {}", e)))?;
        state.csv_stream = Some(csv_stream);

        Ok(())
    }

    /// Spawns the writing thread.
    pub fn run(&mut self) {
        let Some(state) = self.state.take() else {
            return;
        };
        self.writing.store(true, Ordering::Release);

        let writing = self.writing.clone();
        let interval = self.write_interval;
        self.handle = Some(thread::spawn(move || {
            writing_loop(state, writing, interval);
        }));
    }

    /// Stops the thread after it drains the buffer and closes the files.
    /// Idempotent.
    pub fn stop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        info!("Stopping file writer...");
        self.writing.store(false, Ordering::Release);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("File writer thread terminated with a panic");
            }
        }
    }

    pub fn bin_path(&self) -> &Path {
        &self.bin_path
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    #[cfg(test)]
    fn state_mut(&mut self) -> &mut WriterState {
        self.state.as_mut().unwrap()
    }
}

fn writing_loop(mut state: WriterState, writing: Arc<AtomicBool>, interval: Duration) {
    info!("Starting file writing thread...");
    let mut next_write_time = Instant::now();

    while writing.load(Ordering::Acquire) {
        thread::sleep(next_write_time.saturating_duration_since(Instant::now()));
        state.write_batch(storage::WRITE_BATCH_SIZE);
        next_write_time += interval;
    }

    // Keep the cadence while the buffer still holds data
    while !state.buffer.is_empty() {
        thread::sleep(next_write_time.saturating_duration_since(Instant::now()));
        state.write_batch(storage::WRITE_BATCH_SIZE);
        next_write_time += interval;
    }

    state.write_batch(usize::MAX);
    state.close();
    info!("File writing thread finished.");
}

impl WriterState {
    /// Drains up to `batch_size` samples and writes them to both streams.
    /// Returns the number drained. With both streams failed the batch is
    /// still consumed so shutdown can drain the buffer.
    fn write_batch(&mut self, batch_size: usize) -> usize {
        if self.bin_stream.is_none() && self.csv_stream.is_none() {
            warn!("Neither CSV nor binary stream is open, discarding batch");
        }

        let mut batch_count = 0;
        while batch_count < batch_size {
            let Some(sample) = self.buffer.try_consume() else {
                break;
            };
            self.write_sample(&sample);
            batch_count += 1;
        }

        if batch_count > 0 {
            self.flush_streams();
        }
        batch_count
    }

    fn write_sample(&mut self, sample: &Sample) {
        let timestamp_us = sample.timestamp_us();
        let first = *self.first_timestamp_us.get_or_insert(timestamp_us);
        let normalized_us = timestamp_us.saturating_sub(first);

        if let Some(stream) = self.bin_stream.as_mut() {
            let raw = volts_to_raw(sample.voltage, self.voltage_range);
            let result = stream
                .write_all(&raw.to_le_bytes())
                .and_then(|_| stream.write_all(&(timestamp_us as i64).to_le_bytes()));

            match result {
                Ok(()) => self.bytes_written += storage::BINARY_RECORD_BYTES as u64,
                Err(e) => {
                    error!("Binary write failed, closing stream: {}", e);
                    self.bin_stream = None;
                }
            }
        }

        if let Some(stream) = self.csv_stream.as_mut() {
            let record = [
                normalized_us.to_string(),
                format!("{:.6}", sample.voltage),
                sample.classification.to_string(),
            ];
            match stream.write_record(&record) {
                Ok(()) => {
                    self.bytes_written +=
                        (record[0].len() + record[1].len() + record[2].len() + 3) as u64;
                }
                Err(e) => {
                    error!("CSV write failed, closing stream: {}", e);
                    self.csv_stream = None;
                }
            }
        }

        self.samples_written += 1;
    }

    fn flush_streams(&mut self) {
        if let Some(stream) = self.bin_stream.as_mut() {
            if let Err(e) = stream.flush() {
                error!("Binary flush failed, closing stream: {}", e);
                self.bin_stream = None;
            }
        }
        if let Some(stream) = self.csv_stream.as_mut() {
            if let Err(e) = stream.flush() {
                error!("CSV flush failed, closing stream: {}", e);
                self.csv_stream = None;
            }
        }
    }

    fn close(&mut self) {
        self.flush_streams();
        self.bin_stream = None;
        self.csv_stream = None;
        info!(
            "Files closed. Total samples: {}, total bytes: {}",
            self.samples_written, self.bytes_written
        );
    }
}
