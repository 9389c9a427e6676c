//! Shared test fixtures: scripted frame/packet sources and inspectable
//! sinks for driving the engine without real decoders or audio hardware.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use streamplay::audio::{FrameSource, FrameStatus, PacketSource, PlaybackSink, SampleFrame, WaveFormat};
use streamplay::playback::BufferHandle;
use streamplay::playback::StopHandle;
use streamplay::{Error, Result};

/// Build a 2-channel frame of 1-byte samples from per-channel planes
pub fn stereo_byte_frame(left: &[u8], right: &[u8]) -> SampleFrame {
    SampleFrame::from_planes(vec![left.to_vec(), right.to_vec()], 1)
}

/// Frame source fed from a prepared script: one list of frames per data
/// packet, in submission order. Flush releases `flush_frames` once, then
/// drains to end-of-stream.
pub struct ScriptedFrameSource {
    per_packet: VecDeque<Vec<SampleFrame>>,
    flush_frames: Vec<SampleFrame>,
    ready: VecDeque<SampleFrame>,
    draining: bool,
    fail_at_submit: Option<usize>,
    submits: usize,
}

impl ScriptedFrameSource {
    pub fn new(per_packet: Vec<Vec<SampleFrame>>) -> Self {
        Self {
            per_packet: per_packet.into(),
            flush_frames: Vec::new(),
            ready: VecDeque::new(),
            draining: false,
            fail_at_submit: None,
            submits: 0,
        }
    }

    /// Frames released by the first flush packet (decoder-buffered output)
    pub fn with_flush_frames(mut self, frames: Vec<SampleFrame>) -> Self {
        self.flush_frames = frames;
        self
    }

    /// Fail the nth data-packet submission (0-based) with a decode error
    pub fn failing_at(mut self, n: usize) -> Self {
        self.fail_at_submit = Some(n);
        self
    }
}

impl FrameSource for ScriptedFrameSource {
    fn submit(&mut self, packet: &[u8]) -> Result<()> {
        if packet.is_empty() {
            if !self.draining {
                self.ready.extend(self.flush_frames.drain(..));
                self.draining = true;
            }
            return Ok(());
        }

        if self.fail_at_submit == Some(self.submits) {
            return Err(Error::Decode("scripted decode failure".to_string()));
        }
        self.submits += 1;

        if let Some(frames) = self.per_packet.pop_front() {
            self.ready.extend(frames);
        }
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<FrameStatus> {
        if let Some(frame) = self.ready.pop_front() {
            return Ok(FrameStatus::Frame(frame));
        }
        if self.draining {
            Ok(FrameStatus::EndOfStream)
        } else {
            Ok(FrameStatus::NeedsMoreInput)
        }
    }
}

/// Packet source yielding a fixed number of placeholder packets
pub struct VecPacketSource {
    packets: VecDeque<Vec<u8>>,
}

impl VecPacketSource {
    pub fn with_count(count: usize) -> Self {
        Self {
            packets: (0..count).map(|i| vec![i as u8, 0xAA]).collect(),
        }
    }
}

impl PacketSource for VecPacketSource {
    fn next_packet(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.packets.pop_front())
    }
}

/// Packet source that raises the stop flag after yielding `stop_after`
/// packets, simulating an external cancel mid-stream
pub struct StoppingPacketSource {
    inner: VecPacketSource,
    stop_after: usize,
    yielded: usize,
    pub stop_handle: Option<StopHandle>,
}

impl StoppingPacketSource {
    pub fn new(count: usize, stop_after: usize) -> Self {
        Self {
            inner: VecPacketSource::with_count(count),
            stop_after,
            yielded: 0,
            stop_handle: None,
        }
    }
}

impl PacketSource for StoppingPacketSource {
    fn next_packet(&mut self) -> Result<Option<Vec<u8>>> {
        if self.yielded == self.stop_after {
            if let Some(handle) = &self.stop_handle {
                handle.stop();
            }
        }
        self.yielded += 1;
        self.inner.next_packet()
    }
}

/// Observable record of everything a sink was asked to do
#[derive(Default)]
pub struct SinkLog {
    pub buffers: Vec<Vec<u8>>,
    pub opened: bool,
    pub started: bool,
    pub stopped: bool,
}

/// Playback sink that records submissions. With `auto_complete`, every
/// submitted buffer is reported played immediately; otherwise completions
/// never arrive (stalled-sink simulation).
pub struct CollectingSink {
    log: Arc<Mutex<SinkLog>>,
    tx: Option<mpsc::Sender<BufferHandle>>,
    auto_complete: bool,
    fail_submit: bool,
    stopped: Arc<AtomicBool>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(SinkLog::default())),
            tx: None,
            auto_complete: true,
            fail_submit: false,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Never report completions, simulating a sink that stops draining
    pub fn stalled(mut self) -> Self {
        self.auto_complete = false;
        self
    }

    /// Reject every submission
    pub fn refusing(mut self) -> Self {
        self.fail_submit = true;
        self
    }

    pub fn log(&self) -> Arc<Mutex<SinkLog>> {
        Arc::clone(&self.log)
    }

    pub fn stopped_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stopped)
    }
}

impl PlaybackSink for CollectingSink {
    fn on_buffer_played(&mut self, tx: mpsc::Sender<BufferHandle>) {
        self.tx = Some(tx);
    }

    fn open(&mut self, _format: &WaveFormat) -> Result<()> {
        self.log.lock().unwrap().opened = true;
        Ok(())
    }

    fn submit(&mut self, handle: BufferHandle, bytes: &[u8]) -> Result<()> {
        if self.fail_submit {
            return Err(Error::AudioOutput("scripted submit failure".to_string()));
        }
        self.log.lock().unwrap().buffers.push(bytes.to_vec());
        if self.auto_complete {
            if let Some(tx) = &self.tx {
                let _ = tx.send(handle);
            }
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.log.lock().unwrap().started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.log.lock().unwrap().stopped = true;
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Sink whose completions arrive from a background thread after a delay,
/// exercising the engine's bounded backpressure wait
pub struct DelayedSink {
    inner: CollectingSink,
    delay: Duration,
}

impl DelayedSink {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: CollectingSink::new().stalled(),
            delay,
        }
    }

    pub fn log(&self) -> Arc<Mutex<SinkLog>> {
        self.inner.log()
    }
}

impl PlaybackSink for DelayedSink {
    fn on_buffer_played(&mut self, tx: mpsc::Sender<BufferHandle>) {
        self.inner.on_buffer_played(tx);
    }

    fn open(&mut self, format: &WaveFormat) -> Result<()> {
        self.inner.open(format)
    }

    fn submit(&mut self, handle: BufferHandle, bytes: &[u8]) -> Result<()> {
        self.inner.submit(handle, bytes)?;
        if let Some(tx) = &self.inner.tx {
            let tx = tx.clone();
            let delay = self.delay;
            std::thread::spawn(move || {
                std::thread::sleep(delay);
                let _ = tx.send(handle);
            });
        }
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.inner.start()
    }

    fn stop(&mut self) -> Result<()> {
        self.inner.stop()
    }
}

/// Default engine test wave format: 2 channels of unsigned 8-bit samples,
/// so scripted 1-byte frames line up with the block size
pub fn byte_stereo_format() -> WaveFormat {
    WaveFormat {
        sample_rate: 8000,
        channels: 2,
        sample_format: streamplay::audio::SampleFormat::U8,
    }
}
