// src/application.rs
//! Pipeline lifecycle controller
//!
//! Owns both ring buffers and every stage, and drives the graceful
//! shutdown order: acquisition exits first and shuts down the raw buffer,
//! the analyzer drains it and shuts down the classified buffer, the writer
//! drains that and closes its files, and only then are the finalized files
//! offered to the TCP client.

use crate::acquisition::{run_acquisition, AcquisitionConfig, RingBuffer};
use crate::config::PipelineConfig;
use crate::error::EcgError;
use crate::hal::types::Sample;
use crate::hal::SampleSource;
use crate::network::TcpFileServer;
use crate::processing::{DetectorConfig, EcgAnalyzer};
use crate::storage::FileWriter;
use log::{error, info};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Top-level controller for one acquisition run
pub struct Application {
    config: PipelineConfig,
    buffer_raw: Arc<RingBuffer<Sample>>,
    analyzer: EcgAnalyzer,
    writer: FileWriter,
    tcp_server: Option<TcpFileServer>,
    source: Option<Box<dyn SampleSource>>,
    running: Arc<AtomicBool>,
    shutdown_requested: Arc<AtomicBool>,
}

impl Application {
    /// Wires the stages together. The TCP server is created only when the
    /// configuration carries a port (the hardware-shaped configuration).
    pub fn new(config: PipelineConfig, source: Box<dyn SampleSource>) -> Self {
        let capacity = config.effective_buffer_capacity();
        let buffer_raw = Arc::new(RingBuffer::new(capacity));
        let buffer_classified = Arc::new(RingBuffer::new(capacity));

        let analyzer = EcgAnalyzer::new(
            buffer_raw.clone(),
            buffer_classified.clone(),
            DetectorConfig::from_pipeline(&config),
        );

        let writer = FileWriter::new(
            buffer_classified,
            &config.output_dir,
            &config.base_filename,
            config.write_interval,
            config.voltage_range_v,
        );

        let tcp_server = config
            .tcp_port
            .map(|port| TcpFileServer::new(port, config.output_dir.clone()));

        Self {
            config,
            buffer_raw,
            analyzer,
            writer,
            tcp_server,
            source: Some(source),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Validates configuration and initializes every component. Must
    /// succeed before [`run`](Self::run).
    pub fn start(&mut self) -> Result<(), EcgError> {
        info!("Starting application...");
        self.config.validate()?;

        info!("Sample rate: {} SPS", self.config.sample_rate_sps);
        info!(
            "Sample period: {} us",
            self.config.sample_period().as_micros()
        );

        let available = self
            .source
            .as_ref()
            .map(|s| s.available())
            .unwrap_or(false);
        if !available {
            return Err(EcgError::Source("data source not available".to_string()));
        }

        self.writer.init()?;

        if let Some(server) = self.tcp_server.as_mut() {
            server.init()?;
        }

        info!("All components initialized successfully");
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    /// Runs the pipeline to completion: acquisition window, external
    /// shutdown, or source exhaustion, followed by the full drain.
    pub fn run(&mut self) {
        if !self.running.load(Ordering::Acquire) {
            error!("Application not started. Call start() first.");
            return;
        }

        let Some(source) = self.source.take() else {
            error!("Application already ran");
            return;
        };

        let acquisition_config = AcquisitionConfig {
            sample_period: self.config.sample_period(),
            duration: self.config.acquisition_duration,
        };
        let buffer = self.buffer_raw.clone();
        let running = self.running.clone();
        let shutdown = self.shutdown_requested.clone();
        let acquisition_thread = thread::spawn(move || {
            run_acquisition(source, buffer, running, shutdown, acquisition_config);
        });

        self.analyzer.run();
        self.writer.run();
        if let Some(server) = self.tcp_server.as_mut() {
            server.run();
        }

        info!("Waiting for acquisition to complete...");
        if acquisition_thread.join().is_err() {
            error!("Acquisition thread terminated with a panic");
            // The exit protocol may not have run; release the analyzer
            self.running.store(false, Ordering::Release);
            self.buffer_raw.shutdown();
        }

        info!("Acquisition finished, stopping processing stages...");
        self.analyzer.stop();
        self.writer.stop();

        if let Some(server) = self.tcp_server.as_mut() {
            info!("Sending files to connected client (if any)...");
            server.send_available_files();
            server.stop();
        }

        info!("All stages stopped");
    }

    /// Clears the run flag and releases the raw-buffer consumer.
    /// Idempotent; also invoked implicitly when acquisition ends.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            info!("Stopping application...");
            self.buffer_raw.shutdown();
        }
    }

    /// Requests a graceful shutdown, as the signal handler does.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
    }

    /// Flag handle for registering OS signal hooks.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown_requested.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn bin_path(&self) -> &Path {
        self.writer.bin_path()
    }

    pub fn csv_path(&self) -> &Path {
        self.writer.csv_path()
    }

    /// Port the TCP server bound, when one is configured and initialized
    pub fn tcp_port(&self) -> Option<u16> {
        self.tcp_server.as_ref().map(|s| s.port())
    }
}
