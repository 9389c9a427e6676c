//! Playback engine
//!
//! Thin driver loop around the streaming repacker: pulls compressed packets,
//! cycles output buffers through the pool, and hands filled buffers to the
//! playback sink. All blocking lives here; the repacker itself never
//! blocks. Waiting for a free buffer is a bounded wait on the sink's
//! completion channel with periodic stop-flag re-checks, never a busy loop.

use crate::audio::decoder::FrameSource;
use crate::audio::media::PacketSource;
use crate::audio::output::PlaybackSink;
use crate::audio::types::WaveFormat;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::playback::buffer_pool::{BufferHandle, BufferPool};
use crate::playback::repacker::StreamingRepacker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Counters reported at session end
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    /// Buffers handed to the playback sink
    pub buffers_submitted: u64,

    /// Total bytes across all submitted buffers
    pub bytes_submitted: u64,

    /// True if the session ended on a stop request rather than end of
    /// stream
    pub stopped: bool,
}

/// Cancels a running session from another thread.
///
/// The engine checks the flag between packets and before every buffer
/// submission; on stop, the filling buffer is discarded and resources are
/// released.
#[derive(Debug, Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Request the session to stop at the next check point
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once a stop has been requested
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Drives one decode-and-playback session.
///
/// Owns the repacker (and its spillover carry), the buffer pool, the frame
/// source, and the sink; a new engine is constructed per stream session, so
/// multiple sessions can run concurrently without shared state.
pub struct PlaybackEngine<S, K>
where
    S: FrameSource,
    K: PlaybackSink,
{
    source: S,
    sink: K,
    repacker: StreamingRepacker,
    pool: BufferPool,
    config: EngineConfig,
    completion_rx: mpsc::Receiver<BufferHandle>,
    stop_flag: Arc<AtomicBool>,
    started: bool,
}

impl<S, K> PlaybackEngine<S, K>
where
    S: FrameSource,
    K: PlaybackSink,
{
    /// Create an engine for one session, opening the sink for the given
    /// wave format.
    pub fn new(config: EngineConfig, wave_format: WaveFormat, source: S, mut sink: K) -> Result<Self> {
        config.validate()?;

        let block_align = wave_format.block_align() as usize;
        if config.buffer_capacity < block_align {
            return Err(Error::Config(format!(
                "buffer_capacity {} is smaller than one interleaved block ({} bytes)",
                config.buffer_capacity, block_align
            )));
        }
        if config.buffer_capacity % block_align != 0 {
            debug!(
                "Buffer capacity {} is not a multiple of the {}-byte block; \
                 buffer boundaries may fall between channels of one sample",
                config.buffer_capacity, block_align
            );
        }

        let (completion_tx, completion_rx) = mpsc::channel();
        sink.on_buffer_played(completion_tx);
        sink.open(&wave_format)?;

        Ok(Self {
            source,
            sink,
            repacker: StreamingRepacker::new(),
            pool: BufferPool::new(config.buffer_count, config.buffer_capacity),
            config,
            completion_rx,
            stop_flag: Arc::new(AtomicBool::new(false)),
            started: false,
        })
    }

    /// Handle for cancelling the session from another thread
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: Arc::clone(&self.stop_flag),
        }
    }

    /// Run the session to end of stream (or stop request).
    ///
    /// On a fatal error every pool buffer is released and the sink stopped
    /// before the error propagates; no buffer is left `Filling` or
    /// `Submitted`.
    pub fn run(&mut self, input: &mut dyn PacketSource) -> Result<SessionStats> {
        match self.run_session(input) {
            Ok(stats) => Ok(stats),
            Err(e) => {
                self.abort();
                Err(e)
            }
        }
    }

    fn run_session(&mut self, input: &mut dyn PacketSource) -> Result<SessionStats> {
        let mut stats = SessionStats::default();
        let mut pending: Option<Vec<u8>> = None;
        let mut flushing = false;
        let mut active: Option<BufferHandle> = None;

        loop {
            if self.stopped() {
                return self.cancel(stats);
            }

            if pending.is_none() && !flushing {
                match input.next_packet()? {
                    Some(packet) => pending = Some(packet),
                    None => {
                        flushing = true;
                        debug!("Input exhausted, flushing decoder");
                    }
                }
            }

            let handle = match active {
                Some(handle) => handle,
                None => {
                    let handle = match self.wait_for_free_buffer()? {
                        Some(handle) => handle,
                        None => return self.cancel(stats),
                    };
                    self.pool.mark_filling(handle);
                    active = Some(handle);
                    handle
                }
            };

            let packet = if flushing { None } else { pending.as_deref() };
            let step = self
                .repacker
                .repack(&mut self.source, packet, &mut self.pool, handle)?;

            if step.packet_consumed {
                pending = None;
            }

            if step.buffer_filled {
                active = None;
                if self.stopped() {
                    return self.cancel(stats);
                }
                self.submit_buffer(handle, &mut stats)?;
            }

            if step.end_of_stream {
                // Final short buffer is allowed only here, at stream end
                if let Some(handle) = active {
                    if self.stopped() {
                        return self.cancel(stats);
                    }
                    if !self.pool.buffer(handle).is_empty() {
                        self.pool.mark_submitted(handle);
                        self.submit_buffer(handle, &mut stats)?;
                    } else {
                        self.pool.discard_filling(handle);
                    }
                }
                debug!(
                    "End of stream: {} buffers, {} bytes",
                    stats.buffers_submitted, stats.bytes_submitted
                );
                break;
            }
        }

        self.wait_for_drain(&mut stats)?;
        self.sink.stop()?;

        info!(
            "Session complete: {} buffers, {} bytes submitted",
            stats.buffers_submitted, stats.bytes_submitted
        );
        Ok(stats)
    }

    /// Hand a submitted buffer to the sink, starting playback on the first
    /// submission
    fn submit_buffer(&mut self, handle: BufferHandle, stats: &mut SessionStats) -> Result<()> {
        let len = self.pool.buffer(handle).len();
        self.sink.submit(handle, self.pool.buffer(handle).bytes())?;

        if !self.started {
            self.sink.start()?;
            self.started = true;
        }

        stats.buffers_submitted += 1;
        stats.bytes_submitted += len as u64;
        debug!("Submitted buffer {} ({} bytes)", handle.index(), len);
        Ok(())
    }

    /// Wait for a free buffer, applying completions as they arrive.
    ///
    /// Returns `Ok(None)` if a stop was requested while waiting. Errors if
    /// the sink reports nothing within the stall timeout.
    fn wait_for_free_buffer(&mut self) -> Result<Option<BufferHandle>> {
        self.drain_completions();

        let wait_started = Instant::now();
        loop {
            if let Some(handle) = self.pool.acquire_free() {
                return Ok(Some(handle));
            }
            if self.stopped() {
                return Ok(None);
            }
            if wait_started.elapsed() >= Duration::from_millis(self.config.stall_timeout_ms) {
                return Err(Error::Playback(format!(
                    "No buffer completion from playback sink within {} ms",
                    self.config.stall_timeout_ms
                )));
            }

            match self
                .completion_rx
                .recv_timeout(Duration::from_millis(self.config.free_wait_ms))
            {
                Ok(handle) => self.pool.mark_played(handle),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(Error::Playback(
                        "Buffer completion channel closed".to_string(),
                    ));
                }
            }
        }
    }

    /// Apply any completions already queued without blocking
    fn drain_completions(&mut self) {
        while let Ok(handle) = self.completion_rx.try_recv() {
            self.pool.mark_played(handle);
        }
    }

    /// Block until every submitted buffer has been played
    fn wait_for_drain(&mut self, stats: &mut SessionStats) -> Result<()> {
        let wait_started = Instant::now();
        while !self.pool.is_idle() {
            if self.stopped() {
                self.pool.release_all();
                stats.stopped = true;
                return Ok(());
            }
            if wait_started.elapsed() >= Duration::from_millis(self.config.stall_timeout_ms) {
                return Err(Error::Playback(format!(
                    "Playback sink failed to drain within {} ms",
                    self.config.stall_timeout_ms
                )));
            }

            match self
                .completion_rx
                .recv_timeout(Duration::from_millis(self.config.free_wait_ms))
            {
                Ok(handle) => self.pool.mark_played(handle),
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(Error::Playback(
                        "Buffer completion channel closed".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    fn stopped(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    /// Stop-request teardown: discard in-flight buffers, stop the sink
    fn cancel(&mut self, mut stats: SessionStats) -> Result<SessionStats> {
        self.pool.release_all();
        self.repacker.reset();
        let _ = self.sink.stop();
        stats.stopped = true;
        info!(
            "Session stopped by request after {} buffers",
            stats.buffers_submitted
        );
        Ok(stats)
    }

    /// Fatal-error teardown: no buffer may stay `Filling` or `Submitted`
    fn abort(&mut self) {
        warn!("Aborting session; releasing buffers and stopping sink");
        self.pool.release_all();
        self.repacker.reset();
        let _ = self.sink.stop();
    }
}
