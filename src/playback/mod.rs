//! The streaming decode-to-fixed-buffer engine

pub mod buffer_pool;
pub mod engine;
pub mod repacker;
pub mod spillover;

pub use buffer_pool::{BufferHandle, BufferPool, BufferState, PoolBuffer};
pub use engine::{PlaybackEngine, SessionStats, StopHandle};
pub use repacker::{RepackStep, StreamingRepacker};
pub use spillover::SpilloverBuffer;
