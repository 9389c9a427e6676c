//! Audio output using cpal
//!
//! Defines the playback sink interface consumed by the engine and its cpal
//! implementation. Submitted buffers travel to the real-time audio callback
//! through a lock-free ring; the callback reports each buffer's completion
//! once its last sample has been rendered, and outputs silence on underrun.

use crate::audio::types::{SampleFormat, WaveFormat};
use crate::error::{Error, Result};
use crate::playback::buffer_pool::BufferHandle;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use ringbuf::{traits::*, HeapRb};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use tracing::{debug, info, warn};

/// How many submitted buffers may wait in the playout queue. Sized above
/// any sensible pool count so submission never fails on a healthy session.
const PLAYOUT_QUEUE_DEPTH: usize = 16;

/// Accepts fixed-size interleaved buffers for playback.
///
/// Call order: `on_buffer_played` to register the completion channel, then
/// `open` with the session's wave format, then `submit`/`start`/`stop`.
/// Completion events are the only signal crossing back from the sink; they
/// arrive asynchronously relative to the producer.
pub trait PlaybackSink {
    /// Register the channel that receives a handle each time a submitted
    /// buffer has been fully played
    fn on_buffer_played(&mut self, tx: mpsc::Sender<BufferHandle>);

    /// Open the output device for the session's wave format
    fn open(&mut self, format: &WaveFormat) -> Result<()>;

    /// Queue one filled buffer for playback
    fn submit(&mut self, handle: BufferHandle, bytes: &[u8]) -> Result<()>;

    /// Begin rendering queued buffers
    fn start(&mut self) -> Result<()>;

    /// Stop rendering and release the device
    fn stop(&mut self) -> Result<()>;
}

/// One submitted buffer queued for the audio callback
struct QueuedBuffer {
    handle: BufferHandle,
    bytes: Vec<u8>,
    pos: usize,
}

/// Playback sink backed by a cpal output stream.
///
/// The device is opened with an f32 stream; session sample formats are
/// converted in the callback. Mono sessions are duplicated across device
/// channels; wider mismatches map the leading channels and silence the
/// rest.
pub struct CpalSink {
    requested_device: Option<String>,
    stream: Option<Stream>,
    producer: Option<ringbuf::HeapProd<QueuedBuffer>>,
    completion_tx: Option<mpsc::Sender<BufferHandle>>,
    underruns: Arc<AtomicU64>,
}

impl CpalSink {
    /// Create a sink for the named output device (None = default device)
    pub fn new(device_name: Option<String>) -> Self {
        Self {
            requested_device: device_name,
            stream: None,
            producer: None,
            completion_tx: None,
            underruns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// List available audio output devices
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Total underruns observed by the audio callback
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Find the requested device, falling back to the default device
    fn select_device(&self) -> Result<Device> {
        let host = cpal::default_host();

        if let Some(name) = self.requested_device.as_ref() {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

            match devices.find(|d| d.name().ok().as_ref() == Some(name)) {
                Some(device) => {
                    info!("Found requested audio device: {}", name);
                    return Ok(device);
                }
                None => {
                    warn!(
                        "Requested device '{}' not found, falling back to default device",
                        name
                    );
                }
            }
        }

        host.default_output_device()
            .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))
    }

    /// Pick a device configuration matching the session format.
    ///
    /// Prefers an f32 stream at the session's sample rate and channel
    /// count; falls back to the device default otherwise.
    fn get_best_config(device: &Device, format: &WaveFormat) -> Result<StreamConfig> {
        let mut supported = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

        let preferred = supported.find(|config| {
            config.channels() == format.channels
                && config.min_sample_rate().0 <= format.sample_rate
                && config.max_sample_rate().0 >= format.sample_rate
                && config.sample_format() == cpal::SampleFormat::F32
        });

        if let Some(config) = preferred {
            return Ok(config
                .with_sample_rate(cpal::SampleRate(format.sample_rate))
                .config());
        }

        let default = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;
        if default.sample_format() != cpal::SampleFormat::F32 {
            return Err(Error::AudioOutput(format!(
                "Device offers no f32 output (default is {:?})",
                default.sample_format()
            )));
        }

        Ok(default.config())
    }

    /// Decode one channel-sample unit to f32 per the session format
    fn sample_to_f32(format: SampleFormat, bytes: &[u8]) -> f32 {
        match format {
            SampleFormat::F32 => f32::from_ne_bytes(bytes.try_into().unwrap()),
            SampleFormat::I16 => i16::from_ne_bytes(bytes.try_into().unwrap()) as f32 / 32768.0,
            SampleFormat::I32 => {
                i32::from_ne_bytes(bytes.try_into().unwrap()) as f32 / 2147483648.0
            }
            SampleFormat::U8 => (bytes[0] as i32 - 128) as f32 / 128.0,
        }
    }
}

impl PlaybackSink for CpalSink {
    fn on_buffer_played(&mut self, tx: mpsc::Sender<BufferHandle>) {
        self.completion_tx = Some(tx);
    }

    fn open(&mut self, format: &WaveFormat) -> Result<()> {
        let completion_tx = self
            .completion_tx
            .clone()
            .ok_or_else(|| Error::AudioOutput("No completion channel registered".to_string()))?;

        let device = self.select_device()?;
        let config = Self::get_best_config(&device, format)?;

        debug!(
            "Audio config: sample_rate={}, channels={} (session: {} Hz, {} ch, {:?})",
            config.sample_rate.0,
            config.channels,
            format.sample_rate,
            format.channels,
            format.sample_format
        );

        let ring = HeapRb::<QueuedBuffer>::new(PLAYOUT_QUEUE_DEPTH);
        let (producer, mut consumer) = ring.split();

        let device_channels = config.channels as usize;
        let session_channels = format.channels as usize;
        let sample_format = format.sample_format;
        let unit = sample_format.bytes_per_sample();
        let underruns = Arc::clone(&self.underruns);

        let mut current: Option<QueuedBuffer> = None;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut starved = false;

                    // Pull the next channel-sample unit, crossing buffer
                    // boundaries and reporting completions as buffers drain
                    let mut next_sample = |current: &mut Option<QueuedBuffer>| -> Option<f32> {
                        loop {
                            if current.is_none() {
                                *current = consumer.try_pop();
                            }
                            match current {
                                None => return None,
                                Some(queued) => {
                                    if queued.pos + unit <= queued.bytes.len() {
                                        let bytes = &queued.bytes[queued.pos..queued.pos + unit];
                                        queued.pos += unit;
                                        return Some(Self::sample_to_f32(sample_format, bytes));
                                    }
                                    // Buffer fully rendered
                                    let _ = completion_tx.send(queued.handle);
                                    *current = None;
                                }
                            }
                        }
                    };

                    for frame in data.chunks_mut(device_channels) {
                        for ch in 0..device_channels {
                            let value = if starved {
                                None
                            } else if session_channels == 1 {
                                // Mono sessions duplicate into every device
                                // channel; read once per frame
                                if ch == 0 {
                                    next_sample(&mut current)
                                } else {
                                    Some(frame[0])
                                }
                            } else if ch < session_channels {
                                next_sample(&mut current)
                            } else {
                                Some(0.0)
                            };

                            match value {
                                Some(v) => frame[ch] = v.clamp(-1.0, 1.0),
                                None => {
                                    starved = true;
                                    frame[ch] = 0.0;
                                }
                            }
                        }
                    }

                    if starved {
                        let count = underruns.fetch_add(1, Ordering::Relaxed) + 1;
                        if count % 1000 == 1 {
                            warn!("Audio playout underrun (total: {})", count);
                        }
                    }
                },
                move |err| {
                    warn!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))?;

        self.producer = Some(producer);
        self.stream = Some(stream);

        info!("Audio output opened");
        Ok(())
    }

    fn submit(&mut self, handle: BufferHandle, bytes: &[u8]) -> Result<()> {
        let producer = self
            .producer
            .as_mut()
            .ok_or_else(|| Error::AudioOutput("Sink not open".to_string()))?;

        producer
            .try_push(QueuedBuffer {
                handle,
                bytes: bytes.to_vec(),
                pos: 0,
            })
            .map_err(|_| Error::AudioOutput("Playout queue full".to_string()))
    }

    fn start(&mut self) -> Result<()> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| Error::AudioOutput("Sink not open".to_string()))?;

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        info!("Audio stream started");
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
            drop(stream);
            debug!("Audio stream stopped");
        }
        self.producer = None;
        Ok(())
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
