//! Streaming repacker
//!
//! The core of the engine: consumes variable-sized decoded frames and emits
//! a strict sequence of equal-sized output buffers. Leftover sample bytes
//! carry across calls in the spillover buffer, so no sample is dropped or
//! duplicated and no buffer is partially filled except at stream end.
//!
//! Each repack call drains the spillover first, then submits one compressed
//! packet to the frame source and copies decoded frames into the active
//! output buffer in channel-interleaved order. The atomic unit of transfer
//! is one channel's sample: a unit that does not fit in the remaining space
//! is redirected whole to the spillover, never split at the byte level.
//! When the buffer fills mid-packet, frames still queued inside the frame
//! source stay there and are drained by later calls.

use crate::audio::decoder::{FrameSource, FrameStatus};
use crate::audio::types::SampleFrame;
use crate::error::Result;
use crate::playback::buffer_pool::{BufferHandle, BufferPool};
use crate::playback::spillover::SpilloverBuffer;
use tracing::trace;

/// Outcome of one repack call
#[derive(Debug, Clone, Copy)]
pub struct RepackStep {
    /// Bytes written into the active output buffer during this call
    pub bytes_written: usize,

    /// Whether the compressed packet was handed to the frame source.
    /// False when the buffer was submitted from spillover alone; the driver
    /// must re-present the same packet on the next call.
    pub packet_consumed: bool,

    /// Whether the active buffer filled and was marked `Submitted`
    pub buffer_filled: bool,

    /// Whether the frame source reported end of stream
    pub end_of_stream: bool,
}

/// Repacks decoded frames into fixed-size interleaved output buffers.
///
/// One instance per stream session; the spillover carry is an owned field,
/// so multiple concurrent sessions each get independent state.
#[derive(Debug, Default)]
pub struct StreamingRepacker {
    spillover: SpilloverBuffer,
}

impl StreamingRepacker {
    /// Create a repacker with an empty spillover carry
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes currently carried in the spillover buffer
    pub fn spillover_len(&self) -> usize {
        self.spillover.len()
    }

    /// Discard carried state for a new stream session
    pub fn reset(&mut self) {
        self.spillover.clear();
    }

    /// Process one compressed packet (`None` = flush) against the active
    /// output buffer, which must be in `Filling` state.
    ///
    /// The buffer is left `Filling`, or `Submitted` if it reached capacity.
    pub fn repack<S>(
        &mut self,
        source: &mut S,
        packet: Option<&[u8]>,
        pool: &mut BufferPool,
        handle: BufferHandle,
    ) -> Result<RepackStep>
    where
        S: FrameSource + ?Sized,
    {
        let mut bytes_written = 0;

        // Phase 1: drain carried bytes from the previous step
        if !self.spillover.is_empty() {
            bytes_written += self.spillover.drain_into(pool.buffer_mut(handle));
            if pool.buffer(handle).is_full() {
                // Spillover alone filled the buffer; the packet is untouched
                pool.mark_submitted(handle);
                trace!(
                    "Buffer filled from spillover, {} bytes retained",
                    self.spillover.len()
                );
                return Ok(RepackStep {
                    bytes_written,
                    packet_consumed: false,
                    buffer_filled: true,
                    end_of_stream: false,
                });
            }
        }

        // Phase 2: hand the packet to the frame source
        source.submit(packet.unwrap_or(&[]))?;

        // Phase 3: pull decoded frames until the buffer fills or the source
        // runs dry
        loop {
            if pool.buffer(handle).is_full() {
                pool.mark_submitted(handle);
                return Ok(RepackStep {
                    bytes_written,
                    packet_consumed: true,
                    buffer_filled: true,
                    end_of_stream: false,
                });
            }

            match source.receive_frame()? {
                FrameStatus::Frame(frame) => {
                    bytes_written += self.copy_frame(&frame, pool, handle);
                }
                FrameStatus::NeedsMoreInput => {
                    return Ok(RepackStep {
                        bytes_written,
                        packet_consumed: true,
                        buffer_filled: false,
                        end_of_stream: false,
                    });
                }
                FrameStatus::EndOfStream => {
                    return Ok(RepackStep {
                        bytes_written,
                        packet_consumed: true,
                        buffer_filled: false,
                        end_of_stream: true,
                    });
                }
            }
        }
    }

    /// Copy one frame into the output buffer in channel-interleaved order.
    ///
    /// For each sample index, each channel's sample bytes are written in
    /// channel order. Units that no longer fit go whole to the spillover.
    /// Returns the bytes written to the buffer (spilled bytes excluded).
    fn copy_frame(
        &mut self,
        frame: &SampleFrame,
        pool: &mut BufferPool,
        handle: BufferHandle,
    ) -> usize {
        let unit = frame.bytes_per_sample();
        let buf = pool.buffer_mut(handle);
        let mut written = 0;

        for index in 0..frame.samples() {
            for channel in 0..frame.channels() {
                let bytes = frame.sample_bytes(channel, index);
                if buf.remaining() >= unit {
                    buf.write(bytes);
                    written += unit;
                } else {
                    self.spillover.append(bytes);
                }
            }
        }

        if written < frame.total_bytes() {
            trace!(
                "Frame overflowed buffer: {} of {} bytes spilled",
                frame.total_bytes() - written,
                frame.total_bytes()
            );
        }

        written
    }
}
