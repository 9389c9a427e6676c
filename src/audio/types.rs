//! Core audio data types
//!
//! Defines the decoded frame and wave-format structures used throughout the
//! repacking pipeline.

/// Sample value format of decoded audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Unsigned 8-bit integer
    U8,
    /// Signed 16-bit integer
    I16,
    /// Signed 32-bit integer
    I32,
    /// 32-bit IEEE float
    F32,
}

impl SampleFormat {
    /// Size of one channel's sample in bytes
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::I16 => 2,
            SampleFormat::I32 | SampleFormat::F32 => 4,
        }
    }
}

/// Wave format descriptor for a playback session.
///
/// Derived once per stream from the probed container and the decoder's
/// output format; immutable for the session's lifetime. Consumed by the
/// playback sink when the output device is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveFormat {
    /// Samples per second per channel
    pub sample_rate: u32,

    /// Number of channels
    pub channels: u16,

    /// Sample value format of the decoded output
    pub sample_format: SampleFormat,
}

impl WaveFormat {
    /// Bits per sample for one channel
    pub fn bits_per_sample(&self) -> u16 {
        (self.sample_format.bytes_per_sample() * 8) as u16
    }

    /// Bytes per interleaved sample block (all channels at one sample index)
    pub fn block_align(&self) -> u16 {
        self.channels * self.sample_format.bytes_per_sample() as u16
    }

    /// Average byte rate of the interleaved stream
    pub fn avg_bytes_per_sec(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }
}

/// One unit of decoder output: a fixed sample count across all channels,
/// stored per-channel (planar).
///
/// The repacker fully consumes a frame's data before requesting the next,
/// copying it into the interleaved output; a frame never outlives one repack
/// step.
#[derive(Debug, Clone)]
pub struct SampleFrame {
    /// Per-channel sample bytes, one plane per channel in channel order
    planes: Vec<Vec<u8>>,

    /// Number of samples per channel
    samples: usize,

    /// Size of one channel's sample in bytes
    bytes_per_sample: usize,
}

impl SampleFrame {
    /// Create a frame from per-channel byte planes.
    ///
    /// # Panics
    /// Panics if the planes differ in length or a plane is not a whole
    /// number of samples.
    pub fn from_planes(planes: Vec<Vec<u8>>, bytes_per_sample: usize) -> Self {
        assert!(bytes_per_sample > 0, "bytes_per_sample must be non-zero");
        let plane_len = planes.first().map(|p| p.len()).unwrap_or(0);
        for plane in &planes {
            assert_eq!(plane.len(), plane_len, "channel planes must be equal length");
        }
        assert_eq!(plane_len % bytes_per_sample, 0, "plane length must be whole samples");

        Self {
            samples: plane_len / bytes_per_sample,
            bytes_per_sample,
            planes,
        }
    }

    /// Number of samples per channel
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    /// Size of one channel's sample in bytes
    pub fn bytes_per_sample(&self) -> usize {
        self.bytes_per_sample
    }

    /// Total byte size of the frame across all channels
    pub fn total_bytes(&self) -> usize {
        self.samples * self.channels() * self.bytes_per_sample
    }

    /// Bytes of one channel's sample at the given sample index
    pub fn sample_bytes(&self, channel: usize, index: usize) -> &[u8] {
        let start = index * self.bytes_per_sample;
        &self.planes[channel][start..start + self.bytes_per_sample]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wave_format_derivation() {
        let format = WaveFormat {
            sample_rate: 44100,
            channels: 2,
            sample_format: SampleFormat::F32,
        };
        assert_eq!(format.bits_per_sample(), 32);
        assert_eq!(format.block_align(), 8);
        assert_eq!(format.avg_bytes_per_sec(), 352800);
    }

    #[test]
    fn test_wave_format_mono_i16() {
        let format = WaveFormat {
            sample_rate: 8000,
            channels: 1,
            sample_format: SampleFormat::I16,
        };
        assert_eq!(format.bits_per_sample(), 16);
        assert_eq!(format.block_align(), 2);
        assert_eq!(format.avg_bytes_per_sec(), 16000);
    }

    #[test]
    fn test_sample_frame_accessors() {
        let frame = SampleFrame::from_planes(vec![vec![1, 3, 5], vec![2, 4, 6]], 1);
        assert_eq!(frame.samples(), 3);
        assert_eq!(frame.channels(), 2);
        assert_eq!(frame.total_bytes(), 6);
        assert_eq!(frame.sample_bytes(0, 1), &[3]);
        assert_eq!(frame.sample_bytes(1, 2), &[6]);
    }

    #[test]
    fn test_sample_frame_multi_byte_samples() {
        let left = vec![0x01, 0x02, 0x03, 0x04];
        let right = vec![0x05, 0x06, 0x07, 0x08];
        let frame = SampleFrame::from_planes(vec![left, right], 2);
        assert_eq!(frame.samples(), 2);
        assert_eq!(frame.sample_bytes(0, 0), &[0x01, 0x02]);
        assert_eq!(frame.sample_bytes(1, 1), &[0x07, 0x08]);
    }

    #[test]
    #[should_panic(expected = "equal length")]
    fn test_sample_frame_rejects_ragged_planes() {
        SampleFrame::from_planes(vec![vec![1, 2], vec![3]], 1);
    }
}
