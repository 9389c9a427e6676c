//! Spillover buffer
//!
//! Holds sample bytes that were decoded but did not fit into the output
//! buffer being filled, carrying them to the next repack step. Owned solely
//! by the repacker; not thread-shared. Drained at the start of every repack
//! call, so in practice its length stays below one frame's size.

use crate::playback::buffer_pool::PoolBuffer;

/// Ordered byte carry-over between repack steps
#[derive(Debug, Default)]
pub struct SpilloverBuffer {
    bytes: Vec<u8>,
}

impl SpilloverBuffer {
    /// Create an empty spillover buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no bytes are carried
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of carried bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Append sample bytes to the carry
    pub fn append(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Move as many carried bytes as fit into the output buffer's free
    /// space, oldest first. Any remainder shifts to the front of the carry.
    ///
    /// Returns the number of bytes moved.
    pub fn drain_into(&mut self, buf: &mut PoolBuffer) -> usize {
        let n = self.bytes.len().min(buf.remaining());
        if n > 0 {
            buf.write(&self.bytes[..n]);
            self.bytes.drain(..n);
        }
        n
    }

    /// Discard all carried bytes (new stream session)
    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}
