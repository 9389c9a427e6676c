//! Container probing and compressed packet iteration
//!
//! Opens a media file, locates the audio track, derives the session's wave
//! format descriptor, and yields the track's compressed packets in order.
//! Container-level concerns (tag skipping, framing, track interleaving) are
//! symphonia's responsibility.

use crate::audio::types::{SampleFormat, WaveFormat};
use crate::error::{Error, Result};
use std::path::Path;
use symphonia::core::codecs::{CodecParameters, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

/// Yields compressed packets from an input stream, in order.
///
/// `None` signals input exhaustion; the driver then switches to flushing
/// the decoder.
pub trait PacketSource {
    /// Next compressed packet, or `None` at end of input
    fn next_packet(&mut self) -> Result<Option<Vec<u8>>>;
}

/// A probed media file: audio track identity, wave format, and packets
pub struct MediaSource {
    format: Box<dyn FormatReader>,
    track_id: u32,
    codec_params: CodecParameters,
    wave_format: WaveFormat,
}

impl MediaSource {
    /// Probe a media file and locate its audio track.
    ///
    /// The derived wave format describes the decoder's output (32-bit
    /// float), not the bit depth stored in the container.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Decode(format!("Failed to open {}: {}", path.display(), e)))?;

        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;
        let channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| Error::Decode("Channel count not found".to_string()))?;

        // The frame source converts all decoded formats to f32
        let wave_format = WaveFormat {
            sample_rate,
            channels,
            sample_format: SampleFormat::F32,
        };

        debug!(
            "Probed audio track {}: codec={:?}, sample_rate={}, channels={}",
            track_id, codec_params.codec, sample_rate, channels
        );

        Ok(Self {
            format,
            track_id,
            codec_params,
            wave_format,
        })
    }

    /// Session wave format descriptor
    pub fn wave_format(&self) -> &WaveFormat {
        &self.wave_format
    }

    /// Codec parameters of the audio track, for constructing a decoder
    pub fn codec_params(&self) -> &CodecParameters {
        &self.codec_params
    }

    /// Track duration in milliseconds, when the container reports it
    pub fn duration_ms(&self) -> Option<u64> {
        self.codec_params
            .n_frames
            .map(|frames| frames * 1000 / self.wave_format.sample_rate as u64)
    }
}

impl PacketSource for MediaSource {
    fn next_packet(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            match self.format.next_packet() {
                Ok(packet) => {
                    // Skip packets belonging to other tracks
                    if packet.track_id() != self.track_id {
                        continue;
                    }
                    return Ok(Some(packet.buf().to_vec()));
                }
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of input");
                    return Ok(None);
                }
                Err(e) => {
                    return Err(Error::Decode(format!("Error reading packet: {}", e)));
                }
            }
        }
    }
}
