//! Error types for streamplay
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for streamplay
///
/// All variants are fatal to the session in which they occur; the driver
/// releases the buffer pool and stops the playback sink before propagating.
/// Buffer-pool exhaustion is deliberately not represented here: it is a
/// backpressure signal (`BufferPool::acquire_free` returning `None`), not an
/// error.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Decoder rejected a compressed packet
    #[error("Packet submission error: {0}")]
    InputSubmission(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Playback engine errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type using streamplay Error
pub type Result<T> = std::result::Result<T, Error>;
