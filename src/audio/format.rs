//! Fixed capture format and the per-session stream configuration.

use std::time::Duration;

/// Samples per chunk read from (or written to) a device.
pub const CHUNK_SIZE: usize = 1024;

/// Recordings are always mono.
pub const CHANNELS: u16 = 1;

/// Bytes per sample (16-bit signed little-endian PCM).
pub const SAMPLE_WIDTH: u16 = 2;

/// Stream configuration for one recording session.
///
/// Only the sample rate is selectable; channel count, sample format and chunk
/// size are fixed. A session keeps the configuration it was recorded with, so
/// playback and export of a take always use the rate it was captured at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_width: u16,
    pub chunk_size: usize,
}

impl SessionConfig {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: CHANNELS,
            sample_width: SAMPLE_WIDTH,
            chunk_size: CHUNK_SIZE,
        }
    }

    /// Size of one chunk in bytes.
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_size * self.channels as usize * self.sample_width as usize
    }

    /// Playback time represented by `bytes` of frame data.
    pub fn duration_of(&self, bytes: usize) -> Duration {
        let frame_bytes = self.channels as usize * self.sample_width as usize;
        let frames = (bytes / frame_bytes) as u64;
        Duration::from_nanos(frames * 1_000_000_000 / self.sample_rate as u64)
    }

    /// WAV header parameters for this configuration.
    pub fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.sample_width * 8,
            sample_format: hound::SampleFormat::Int,
        }
    }
}
