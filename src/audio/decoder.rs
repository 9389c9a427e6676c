//! Frame source abstraction and symphonia-backed decoder
//!
//! A frame source accepts compressed packets and yields decoded planar
//! frames on demand. "Needs more input" and "end of stream" are ordinary
//! loop-terminating conditions, not errors.

use crate::audio::types::{SampleFormat, SampleFrame};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions};
use symphonia::core::conv::IntoSample;
use symphonia::core::formats::Packet;
use tracing::{debug, trace};

/// Result of asking a frame source for its next decoded frame
#[derive(Debug)]
pub enum FrameStatus {
    /// One decoded frame, ready to be repacked
    Frame(SampleFrame),

    /// The data submitted so far is not enough to produce another frame
    NeedsMoreInput,

    /// The stream is fully drained; no further frames will be produced
    EndOfStream,
}

/// Produces decoded frames from compressed packets.
///
/// An empty packet signals flush: the source stops expecting input and
/// drains whatever output it has buffered, then reports `EndOfStream`.
pub trait FrameSource {
    /// Hand one compressed packet to the decoder.
    ///
    /// A rejected packet is fatal to the session.
    fn submit(&mut self, packet: &[u8]) -> Result<()>;

    /// Retrieve the next decoded frame, if one is ready
    fn receive_frame(&mut self) -> Result<FrameStatus>;
}

/// Frame source backed by a symphonia decoder.
///
/// Decoded audio of any source format is converted to planar f32 (native
/// byte order), so the session's wave format is always 32-bit float.
/// Frames decoded but not yet retrieved stay queued here, which lets the
/// repacker stop pulling mid-packet when its output buffer fills.
pub struct SymphoniaFrameSource {
    decoder: Box<dyn Decoder>,
    track_id: u32,
    ready: VecDeque<SampleFrame>,
    draining: bool,
}

impl SymphoniaFrameSource {
    /// Create a decoder for the given codec parameters (as probed from the
    /// container).
    pub fn new(codec_params: &CodecParameters) -> Result<Self> {
        let decoder = symphonia::default::get_codecs()
            .make(codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        debug!("Created decoder for codec {:?}", codec_params.codec);

        Ok(Self {
            decoder,
            track_id: 0,
            ready: VecDeque::new(),
            draining: false,
        })
    }

    /// Number of decoded frames queued but not yet retrieved
    pub fn ready_frames(&self) -> usize {
        self.ready.len()
    }

    /// Convert a decoded buffer of any sample format to planar f32 bytes
    fn planar_f32_frame(decoded: &AudioBufferRef) -> SampleFrame {
        macro_rules! convert {
            ($buf:expr) => {{
                let channels = $buf.spec().channels.count();
                let frames = $buf.frames();
                let mut planes = Vec::with_capacity(channels);
                for ch in 0..channels {
                    let mut plane = Vec::with_capacity(frames * 4);
                    for &sample in &$buf.chan(ch)[..frames] {
                        let value: f32 = sample.into_sample();
                        plane.extend_from_slice(&value.to_ne_bytes());
                    }
                    planes.push(plane);
                }
                SampleFrame::from_planes(planes, SampleFormat::F32.bytes_per_sample())
            }};
        }

        match decoded {
            AudioBufferRef::U8(buf) => convert!(buf),
            AudioBufferRef::U16(buf) => convert!(buf),
            AudioBufferRef::U24(buf) => convert!(buf),
            AudioBufferRef::U32(buf) => convert!(buf),
            AudioBufferRef::S8(buf) => convert!(buf),
            AudioBufferRef::S16(buf) => convert!(buf),
            AudioBufferRef::S24(buf) => convert!(buf),
            AudioBufferRef::S32(buf) => convert!(buf),
            AudioBufferRef::F32(buf) => convert!(buf),
            AudioBufferRef::F64(buf) => convert!(buf),
        }
    }
}

impl FrameSource for SymphoniaFrameSource {
    fn submit(&mut self, packet: &[u8]) -> Result<()> {
        if packet.is_empty() {
            // Flush: no new input, drain whatever is queued
            self.draining = true;
            return Ok(());
        }

        let packet = Packet::new_from_slice(self.track_id, 0, 0, packet);
        let decoded = self.decoder.decode(&packet).map_err(|e| match e {
            symphonia::core::errors::Error::DecodeError(msg) => {
                Error::InputSubmission(format!("Decoder rejected packet: {}", msg))
            }
            other => Error::Decode(format!("Error during decoding: {}", other)),
        })?;

        if decoded.frames() > 0 {
            trace!(
                "Decoded frame: {} samples x {} channels",
                decoded.frames(),
                decoded.spec().channels.count()
            );
            self.ready.push_back(Self::planar_f32_frame(&decoded));
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
