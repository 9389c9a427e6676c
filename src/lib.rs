//! # streamplay
//!
//! Incremental audio decode and gap-free streaming playback.
//!
//! **Purpose:** Decode a compressed audio stream packet by packet and repack
//! the decoded planar frames into a strict sequence of equal-sized
//! interleaved PCM buffers, cycled through a small pool feeding a streaming
//! output device. Leftover sample bytes carry across steps so no sample is
//! dropped or duplicated, and no buffer is partially filled except the last.
//!
//! **Architecture:** symphonia decode behind a [`audio::FrameSource`],
//! repacking in [`playback::StreamingRepacker`], cpal output behind a
//! [`audio::PlaybackSink`], orchestrated by [`playback::PlaybackEngine`].

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use playback::{PlaybackEngine, SessionStats, StopHandle};
