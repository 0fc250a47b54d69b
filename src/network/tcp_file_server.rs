// src/network/tcp_file_server.rs
//! Single-client TCP push server for finalized recordings
//!
//! Accepts one operator workstation at a time (latest connection wins) and
//! pushes every regular file in the data directory once the application
//! marks them final. Wire format is a line-oriented ASCII header per file
//! followed by the raw bytes:
//!
//! ```text
//! FILES <n>\n
//! FILE <name> <size>\n<bytes...>
//! ```

use crate::config::constants::network;
use crate::error::EcgError;
use log::{error, info, warn};
use std::fs::File;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// TCP file transfer server
pub struct TcpFileServer {
    port: u16,
    data_directory: PathBuf,
    listener: Option<TcpListener>,
    client: Arc<Mutex<Option<TcpStream>>>,
    files_ready: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    connections_handled: Arc<AtomicUsize>,
    bytes_transferred: Arc<AtomicU64>,
}

impl TcpFileServer {
    pub fn new<P: Into<PathBuf>>(port: u16, data_directory: P) -> Self {
        Self {
            port,
            data_directory: data_directory.into(),
            listener: None,
            client: Arc::new(Mutex::new(None)),
            files_ready: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            connections_handled: Arc::new(AtomicUsize::new(0)),
            bytes_transferred: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Verifies the data directory and opens the listening socket.
    pub fn init(&mut self) -> Result<(), EcgError> {
        info!("Initializing TCP file server on port {}", self.port);

        if !self.data_directory.is_dir() {
            return Err(EcgError::Network(format!(
                "data directory does not exist: {}",
                self.data_directory.display()
            )));
        }

        let listener = TcpListener::bind(("0.0.0.0", self.port))
            .map_err(|e| EcgError::Network(format!("failed to bind port {}: {}", self.port, e)))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| EcgError::Network(format!("failed to configure listener: {}", e)))?;

        // Resolve the real port when an ephemeral one was requested
        if let Ok(addr) = listener.local_addr() {
            self.port = addr.port();
        }
        self.listener = Some(listener);

        info!("TCP server listening on port {}", self.port);
        info!("Serving files from {}", self.data_directory.display());
        Ok(())
    }

    /// Port actually bound (differs from the requested one for port 0)
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Spawns the accept thread.
    pub fn run(&mut self) {
        if self.handle.is_some() {
            warn!("TCP server already running");
            return;
        }
        let Some(listener) = self.listener.take() else {
            error!("TCP server not initialized");
            return;
        };

        self.running.store(true, Ordering::Release);

        let client = self.client.clone();
        let files_ready = self.files_ready.clone();
        let running = self.running.clone();
        let connections = self.connections_handled.clone();
        let data_directory = self.data_directory.clone();
        let bytes_transferred = self.bytes_transferred.clone();

        self.handle = Some(thread::spawn(move || {
            server_loop(
                listener,
                client,
                files_ready,
                running,
                connections,
                data_directory,
                bytes_transferred,
            );
        }));
        info!("TCP server thread started");
    }

    /// Marks the recordings final and pushes them to the connected client,
    /// if any. With no client connected the files are sent when one
    /// arrives.
    pub fn send_available_files(&self) {
        self.files_ready.store(true, Ordering::Release);
        push_files_to_client(
            &self.client,
            &self.data_directory,
            &self.bytes_transferred,
        );
    }

    /// Closes sockets and joins the accept thread. Idempotent.
    pub fn stop(&mut self) {
        if self.handle.is_none() {
            return;
        }
        info!("Stopping TCP server...");
        self.running.store(false, Ordering::Release);

        {
            let mut client = self.client.lock().unwrap();
            if let Some(stream) = client.take() {
                let _ = stream.shutdown(std::net::Shutdown::Both);
            }
        }

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("TCP server thread terminated with a panic");
            }
        }

        info!(
            "TCP server stopped. Connections handled: {}, bytes transferred: {}",
            self.connections_handled.load(Ordering::Relaxed),
            self.bytes_transferred.load(Ordering::Relaxed)
        );
    }

    pub fn has_connected_client(&self) -> bool {
        self.client.lock().unwrap().is_some()
    }
}

impl Drop for TcpFileServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn server_loop(
    listener: TcpListener,
    client: Arc<Mutex<Option<TcpStream>>>,
    files_ready: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    connections: Arc<AtomicUsize>,
    data_directory: PathBuf,
    bytes_transferred: Arc<AtomicU64>,
) {
    info!("Server listening for connections...");

    while running.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, peer)) => {
                info!("Client connected from {}", peer);
                if let Err(e) = stream.set_nonblocking(false) {
                    warn!("Failed to configure client socket: {}", e);
                }

                {
                    let mut current = client.lock().unwrap();
                    if let Some(previous) = current.take() {
                        warn!("New client connected, closing previous connection");
                        let _ = previous.shutdown(std::net::Shutdown::Both);
                    }
                    *current = Some(stream);
                }
                connections.fetch_add(1, Ordering::Relaxed);

                if files_ready.load(Ordering::Acquire) {
                    push_files_to_client(&client, &data_directory, &bytes_transferred);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                // Accept tick: re-check the run flag once per interval
                thread::sleep(network::ACCEPT_TICK);
            }
            Err(e) => {
                if running.load(Ordering::Acquire) {
                    error!("Failed to accept connection: {}", e);
                }
                break;
            }
        }
    }

    info!("Server loop exited");
}

/// Sends every available file to the registered client and closes it.
/// Without a registered client this is a no-op.
fn push_files_to_client(
    client: &Mutex<Option<TcpStream>>,
    data_directory: &Path,
    bytes_transferred: &AtomicU64,
) {
    let mut guard = client.lock().unwrap();
    let Some(stream) = guard.as_mut() else {
        info!("No client connected - files will be sent when one arrives");
        return;
    };

    info!("Sending files to connected client...");
    let result = send_all_files(stream, data_directory, bytes_transferred);

    match result {
        Ok(()) => info!("All files sent successfully"),
        Err(e) => error!("File transfer failed: {}", e),
    }

    // One session per client; the server side closes after sending
    if let Some(stream) = guard.take() {
        let _ = stream.shutdown(std::net::Shutdown::Both);
    }
}

fn send_all_files(
    stream: &mut TcpStream,
    data_directory: &Path,
    bytes_transferred: &AtomicU64,
) -> std::io::Result<()> {
    let files = list_regular_files(data_directory);

    if files.is_empty() {
        warn!("No files available to send");
        stream.write_all(b"ERROR: No files available\n")?;
        return Ok(());
    }

    for name in &files {
        if !is_safe_filename(name) {
            warn!("Refusing to serve unsafe filename: {}", name);
            stream.write_all(format!("ERROR: unsafe filename {}\n", name).as_bytes())?;
            return Ok(());
        }
    }

    stream.write_all(format!("FILES {}\n", files.len()).as_bytes())?;

    for name in &files {
        let path = data_directory.join(name);
        let sent = send_file(stream, &path, name)?;
        bytes_transferred.fetch_add(sent, Ordering::Relaxed);
    }
    Ok(())
}

fn send_file(stream: &mut TcpStream, path: &Path, name: &str) -> std::io::Result<u64> {
    let mut file = File::open(path)?;
    let size = file.metadata()?.len();

    stream.write_all(format!("FILE {} {}\n", name, size).as_bytes())?;
    info!("Sending file: {} ({} bytes)", name, size);

    let mut chunk = [0u8; network::SEND_CHUNK_BYTES];
    let mut total_sent = 0u64;
    loop {
        let read = file.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        stream.write_all(&chunk[..read])?;
        total_sent += read as u64;
    }

    info!("File sent: {} ({} bytes)", name, total_sent);
    Ok(total_sent)
}

fn list_regular_files(directory: &Path) -> Vec<String> {
    let mut files = Vec::new();

    match std::fs::read_dir(directory) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
                if !is_file {
                    continue;
                }
                if let Some(name) = entry.file_name().to_str() {
                    files.push(name.to_string());
                }
            }
        }
        Err(e) => error!("Error reading directory: {}", e),
    }

    files.sort();
    files
}

fn is_safe_filename(name: &str) -> bool {
    !name.contains("..") && !name.contains('/') && !name.contains('\\')
}
