//! Streaming sample-rate conversion using rubato's FFT-based resampler.
//!
//! Bridges the session sample rate and the rate the hardware actually runs at,
//! in both directions (device → session on capture, session → device on playback).

use audioadapter_buffers::direct::InterleavedSlice;
use parking_lot::Mutex;
use rubato::{Fft, FixedSync, Resampler};
use std::sync::Arc;

use crate::error::{RecorderError, Result};

/// Chunk size for FFT-based resampling (provides good quality and performance).
const CHUNK_SIZE: usize = 1024;

/// Number of sub-chunks for FFT processing (higher = better quality but more CPU).
const SUB_CHUNKS: usize = 2;

/// Resampler state shared with an audio callback.
///
/// Samples arrive in arbitrary sizes; they are accumulated until the resampler
/// has a full input block and every complete block is converted.
pub struct ResamplerState {
    resampler: Fft<f32>,
    output_buffer: Vec<f32>,
    output_frames_max: usize,
    input_buffer: Vec<f32>,
}

impl ResamplerState {
    /// Create a mono resampler from `from_rate` to `to_rate`.
    ///
    /// Returned inside `Arc<Mutex<>>` so it can be moved into a device callback.
    pub fn new(from_rate: u32, to_rate: u32) -> Result<Arc<Mutex<Self>>> {
        let resampler = Fft::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, SUB_CHUNKS, 1, FixedSync::Input)
            .map_err(|e| RecorderError::DeviceUnavailable(format!("Failed to create resampler {from_rate} Hz -> {to_rate} Hz: {e}")))?;

        let output_frames_max = resampler.output_frames_max();

        Ok(Arc::new(Mutex::new(Self {
            resampler,
            output_buffer: vec![0.0f32; output_frames_max],
            output_frames_max,
            input_buffer: Vec::with_capacity(CHUNK_SIZE * 2),
        })))
    }

    /// Feed samples and return whatever output the complete input blocks produced.
    ///
    /// The result is empty when more input is needed.
    pub fn process_samples(&mut self, samples: &[f32]) -> Vec<f32> {
        self.input_buffer.extend_from_slice(samples);

        let mut output = Vec::new();
        loop {
            let needed = self.resampler.input_frames_next();
            if self.input_buffer.len() < needed {
                break;
            }

            let block: Vec<f32> = self.input_buffer.drain(..needed).collect();
            match self.process_block(&block) {
                Some(frames) => output.extend_from_slice(&self.output_buffer[..frames]),
                None => {
                    tracing::warn!("Resampler rejected a block of {} samples", needed);
                    break;
                }
            }
        }
        output
    }

    /// Push the pending tail through the resampler, padding with silence.
    pub fn flush(&mut self) -> Vec<f32> {
        let needed = self.resampler.input_frames_next();
        let mut block = std::mem::take(&mut self.input_buffer);
        block.resize(needed, 0.0);
        match self.process_block(&block) {
            Some(frames) => self.output_buffer[..frames].to_vec(),
            None => Vec::new(),
        }
    }

    fn process_block(&mut self, block: &[f32]) -> Option<usize> {
        let input_adapter = InterleavedSlice::new(block, 1, block.len()).ok()?;
        let mut output_adapter = InterleavedSlice::new_mut(&mut self.output_buffer, 1, self.output_frames_max).ok()?;
        let (_, frames_written) = self.resampler.process_into_buffer(&input_adapter, &mut output_adapter, None).ok()?;
        Some(frames_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(from_rate: u32, to_rate: u32, seconds: usize) -> usize {
        let state = ResamplerState::new(from_rate, to_rate).unwrap();
        let mut state = state.lock();
        let input = vec![0.0f32; from_rate as usize];
        let mut produced = 0;
        for _ in 0..seconds {
            // Feed in uneven pieces like a device callback would
            for piece in input.chunks(441) {
                produced += state.process_samples(piece).len();
            }
        }
        produced
    }

    #[test]
    fn test_streaming_upsampling() {
        // 2 seconds of 16 kHz audio should yield close to 2 seconds at 48 kHz
        let produced = run(16000, 48000, 2);
        assert!((90000..=96000).contains(&produced), "Expected ~96000 samples, got {}", produced);
    }

    #[test]
    fn test_streaming_downsampling() {
        let produced = run(48000, 8000, 2);
        assert!((15000..=16000).contains(&produced), "Expected ~16000 samples, got {}", produced);
    }

    #[test]
    fn test_small_input_waits_for_block() {
        let state = ResamplerState::new(44100, 48000).unwrap();
        assert!(state.lock().process_samples(&[0.0; 10]).is_empty());
        assert!(!state.lock().flush().is_empty());
    }
}
