//! On-disk persistence of the classified stream

pub mod file_writer;

pub use file_writer::FileWriter;
