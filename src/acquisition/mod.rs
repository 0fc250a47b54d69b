//! Sample acquisition: the shared ring buffer and the cadence loop

pub mod ring_buffer;
pub mod sampler;

pub use ring_buffer::RingBuffer;
pub use sampler::{run_acquisition, run_acquisition_with_clock, AcquisitionConfig};
