//! Output buffer pool
//!
//! A fixed count of fixed-capacity output buffers cycled in round-robin
//! fashion. Each buffer is independently in one of three states:
//!
//! `Free → Filling → Submitted → (played) → Free`
//!
//! At most one buffer is in `Filling` state at a time. `acquire_free`
//! returning `None` is the backpressure signal: the driver must wait for the
//! playback sink to report a completion before producing more data.

use tracing::{debug, trace};

/// Lifecycle state of one pool buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// Available for acquisition
    Free,
    /// Being filled by the repacker
    Filling,
    /// Handed to the playback sink, awaiting completion
    Submitted,
}

/// Identity of one buffer within the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle(usize);

impl BufferHandle {
    /// Pool slot index
    pub fn index(&self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn test_handle(index: usize) -> Self {
        BufferHandle(index)
    }
}

/// One fixed-capacity output buffer
#[derive(Debug)]
pub struct PoolBuffer {
    data: Vec<u8>,
    len: usize,
    state: BufferState,
}

impl PoolBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            len: 0,
            state: BufferState::Free,
        }
    }

    /// Fixed capacity in bytes
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no bytes have been written
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if filled to capacity
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Remaining free space in bytes
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len
    }

    /// Current lifecycle state
    pub fn state(&self) -> BufferState {
        self.state
    }

    /// Filled contents
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Append bytes to the buffer.
    ///
    /// # Panics
    /// Panics if the bytes do not fit in the remaining space.
    pub fn write(&mut self, bytes: &[u8]) {
        assert!(bytes.len() <= self.remaining(), "write exceeds buffer capacity");
        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    fn reset(&mut self) {
        self.len = 0;
        self.state = BufferState::Free;
    }
}

/// Fixed-count pool of output buffers with round-robin reuse
pub struct BufferPool {
    buffers: Vec<PoolBuffer>,
    next: usize,
}

impl BufferPool {
    /// Create a pool of `count` buffers, each `capacity` bytes
    pub fn new(count: usize, capacity: usize) -> Self {
        assert!(count > 0, "pool must contain at least one buffer");
        assert!(capacity > 0, "buffer capacity must be non-zero");
        debug!("Creating buffer pool: {} buffers x {} bytes", count, capacity);

        Self {
            buffers: (0..count).map(|_| PoolBuffer::new(capacity)).collect(),
            next: 0,
        }
    }

    /// Number of buffers in the pool
    pub fn count(&self) -> usize {
        self.buffers.len()
    }

    /// Find the next free buffer, round-robin from the last acquisition.
    ///
    /// Returns `None` when every buffer is `Filling` or `Submitted`;
    /// the caller must wait for a completion before producing more data.
    pub fn acquire_free(&mut self) -> Option<BufferHandle> {
        let count = self.buffers.len();
        for offset in 0..count {
            let index = (self.next + offset) % count;
            if self.buffers[index].state == BufferState::Free {
                self.next = (index + 1) % count;
                trace!("Acquired free buffer {}", index);
                return Some(BufferHandle(index));
            }
        }
        None
    }

    /// Transition a buffer from `Free` to `Filling`.
    ///
    /// # Panics
    /// Panics if the buffer is not free, or another buffer is already
    /// filling.
    pub fn mark_filling(&mut self, handle: BufferHandle) {
        assert_eq!(self.buffers[handle.0].state, BufferState::Free);
        assert!(
            !self.buffers.iter().any(|b| b.state == BufferState::Filling),
            "only one buffer may be filling at a time"
        );
        self.buffers[handle.0].state = BufferState::Filling;
    }

    /// Transition a buffer from `Filling` to `Submitted`.
    ///
    /// # Panics
    /// Panics if the buffer is not in `Filling` state.
    pub fn mark_submitted(&mut self, handle: BufferHandle) {
        assert_eq!(self.buffers[handle.0].state, BufferState::Filling);
        self.buffers[handle.0].state = BufferState::Submitted;
        trace!(
            "Buffer {} submitted ({} bytes)",
            handle.0,
            self.buffers[handle.0].len
        );
    }

    /// Return a played buffer to `Free` state, clearing its contents.
    ///
    /// # Panics
    /// Panics if the buffer is not in `Submitted` state.
    pub fn mark_played(&mut self, handle: BufferHandle) {
        assert_eq!(self.buffers[handle.0].state, BufferState::Submitted);
        self.buffers[handle.0].reset();
        trace!("Buffer {} played, returned to pool", handle.0);
    }

    /// Discard a `Filling` buffer without submitting it (stop / abort path)
    pub fn discard_filling(&mut self, handle: BufferHandle) {
        assert_eq!(self.buffers[handle.0].state, BufferState::Filling);
        self.buffers[handle.0].reset();
        debug!("Buffer {} discarded without submission", handle.0);
    }

    /// Return every buffer to `Free` state regardless of its current state.
    ///
    /// Used on session abort so no buffer is left permanently `Filling` or
    /// `Submitted`.
    pub fn release_all(&mut self) {
        for buffer in &mut self.buffers {
            buffer.reset();
        }
        self.next = 0;
        debug!("All pool buffers released");
    }

    /// Borrow a buffer by handle
    pub fn buffer(&self, handle: BufferHandle) -> &PoolBuffer {
        &self.buffers[handle.0]
    }

    /// Mutably borrow a buffer by handle
    pub fn buffer_mut(&mut self, handle: BufferHandle) -> &mut PoolBuffer {
        &mut self.buffers[handle.0]
    }

    /// Number of free buffers
    pub fn free_count(&self) -> usize {
        self.buffers
            .iter()
            .filter(|b| b.state == BufferState::Free)
            .count()
    }

    /// True if every buffer is free (nothing in flight)
    pub fn is_idle(&self) -> bool {
        self.free_count() == self.count()
    }
}
