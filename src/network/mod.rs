//! File transfer to an operator workstation

pub mod tcp_file_server;

pub use tcp_file_server::TcpFileServer;
