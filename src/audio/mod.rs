//! Audio collaborators: decoding, container probing, and device output

pub mod decoder;
pub mod media;
pub mod output;
pub mod types;

pub use decoder::{FrameSource, FrameStatus, SymphoniaFrameSource};
pub use media::{MediaSource, PacketSource};
pub use output::{CpalSink, PlaybackSink};
pub use types::{SampleFormat, SampleFrame, WaveFormat};
