//! Shared audio utilities for capture and playback.

use cpal::traits::DeviceTrait;
use cpal::{Device, SampleFormat, SupportedStreamConfig, SupportedStreamConfigRange};

use crate::error::{RecorderError, Result};

/// Get a human-readable device name.
///
/// # Returns
/// Device name string, or "Unknown" if the name cannot be retrieved.
pub fn get_device_name(device: &Device) -> String {
    device.description().ok().map(|desc| desc.name().to_string()).unwrap_or_else(|| "Unknown".to_string())
}

/// Find the best matching audio configuration.
///
/// Searches for a configuration that:
/// 1. Supports mono or stereo (max 2 channels)
/// 2. Uses F32 sample format
/// 3. Matches the target sample rate, or uses the closest available rate
///
/// Mono configurations are preferred over stereo ones at the same rate.
///
/// # Errors
/// `DeviceUnavailable` if the device offers no usable configuration.
pub fn find_best_config(configs: impl Iterator<Item = SupportedStreamConfigRange>, target_sample_rate: u32) -> Result<SupportedStreamConfig> {
    let mut f32_configs: Vec<SupportedStreamConfigRange> = configs
        .filter(|config| config.channels() <= 2 && config.sample_format() == SampleFormat::F32)
        .collect();

    if f32_configs.is_empty() {
        return Err(RecorderError::DeviceUnavailable("No mono/stereo F32 configuration supported".to_string()));
    }

    f32_configs.sort_by_key(|config| config.channels());

    if let Some(config) = f32_configs
        .iter()
        .find(|config| (config.min_sample_rate()..=config.max_sample_rate()).contains(&target_sample_rate))
    {
        return Ok((*config).with_sample_rate(target_sample_rate));
    }

    // No exact match: use the first config at the rate closest to the target
    let config = &f32_configs[0];
    let rate = if target_sample_rate < config.min_sample_rate() {
        config.min_sample_rate()
    } else {
        config.max_sample_rate()
    };
    Ok((*config).with_sample_rate(rate))
}

/// Convert interleaved f32 samples to mono by averaging channels.
pub fn convert_to_mono_f32(data: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        data.to_vec()
    } else {
        data.chunks(channels).map(|frame| frame.iter().sum::<f32>() / channels as f32).collect()
    }
}

/// Quantize f32 samples in `[-1.0, 1.0]` to i16.
pub fn f32_to_i16(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16).collect()
}

/// Encode i16 samples as little-endian bytes.
pub fn i16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Decode little-endian 16-bit PCM bytes into f32 samples in `[-1.0, 1.0)`.
///
/// A trailing odd byte is ignored.
pub fn le_bytes_to_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}
