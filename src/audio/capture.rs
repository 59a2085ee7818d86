//! Audio capture using cpal.
//!
//! The device callback downmixes to mono, resamples to the session rate when the
//! hardware runs at a different rate, quantizes to i16 and pushes into a
//! lock-free ring buffer. [`CpalInput::read_chunk`] drains the ring buffer one
//! fixed-size chunk at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Producer, Split};
use tracing::{debug, info, warn};

use super::device::InputStream;
use super::format::SessionConfig;
use super::resampler::ResamplerState;
use super::util::{convert_to_mono_f32, f32_to_i16, find_best_config, get_device_name, i16_to_le_bytes};
use crate::error::{RecorderError, Result};

/// Ring buffer capacity in samples (~4 seconds at 16kHz).
const CAPTURE_RING_SIZE: usize = 65536;

/// Sleep between ring buffer polls while waiting for a chunk to fill.
const READ_POLL_INTERVAL: Duration = Duration::from_micros(500);

/// Microphone stream on the default input device.
pub struct CpalInput {
    stream: Option<Stream>,                 // cpal audio stream (None once closed)
    consumer: ringbuf::HeapCons<i16>,       // Ring buffer consumer
    chunk_size: usize,                      // Samples per chunk
    interrupt: Arc<AtomicBool>,             // Makes a pending read give up
    failure: Arc<Mutex<Option<String>>>,    // Error reported by the device callback
}

impl CpalInput {
    /// Open and start the default input device for `config`.
    ///
    /// # Errors
    /// Returns `DeviceUnavailable` if:
    /// - No input device is available
    /// - Failed to get supported input configurations
    /// - No usable configuration exists
    /// - Failed to build or start the input stream
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| RecorderError::DeviceUnavailable("No input device available".to_string()))?;

        info!("Using input device: {}", get_device_name(&device));

        let supported_configs = device
            .supported_input_configs()
            .map_err(|e| RecorderError::DeviceUnavailable(format!("Failed to get supported input configs: {e}")))?;

        let device_config = find_best_config(supported_configs, config.sample_rate)?;
        let device_sample_rate = device_config.sample_rate();
        let channels = device_config.channels() as usize;

        let needs_resampling = device_sample_rate != config.sample_rate;
        if needs_resampling {
            info!("Device sample rate {} Hz differs from session {} Hz - resampling will be applied", device_sample_rate, config.sample_rate);
        }

        debug!("Audio capture config: {} Hz, {} channels, {:?}", device_sample_rate, channels, device_config.sample_format());

        let ring = HeapRb::<i16>::new(CAPTURE_RING_SIZE);
        let (mut producer, consumer) = ring.split();

        let resampler_state = if needs_resampling { Some(ResamplerState::new(device_sample_rate, config.sample_rate)?) } else { None };

        let failure = Arc::new(Mutex::new(None));
        let failure_clone = failure.clone();
        let err_fn = move |err: cpal::StreamError| {
            tracing::error!("Audio capture error: {}", err);
            let mut slot = failure_clone.lock();
            if slot.is_none() {
                *slot = Some(err.to_string());
            }
        };

        let stream_config: StreamConfig = device_config.config();
        let drop_count = AtomicU64::new(0);

        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let mono = convert_to_mono_f32(data, channels);
                    let samples = match &resampler_state {
                        Some(state) => state.lock().process_samples(&mono),
                        None => mono,
                    };

                    let written = producer.push_slice(&f32_to_i16(&samples));
                    if written < samples.len() {
                        let count = drop_count.fetch_add(1, Ordering::Relaxed);
                        if count.is_multiple_of(100) {
                            warn!("Capture ring buffer full, dropped {} audio blocks", count + 1);
                        }
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| RecorderError::DeviceUnavailable(format!("Failed to build input stream: {e}")))?;

        stream
            .play()
            .map_err(|e| RecorderError::DeviceUnavailable(format!("Failed to start input stream: {e}")))?;

        info!("Audio capture started: device {} Hz -> session {} Hz", device_sample_rate, config.sample_rate);

        Ok(Self {
            stream: Some(stream),
            consumer,
            chunk_size: config.chunk_size,
            interrupt: Arc::new(AtomicBool::new(false)),
            failure,
        })
    }
}

impl InputStream for CpalInput {
    fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.stream.is_none() {
            return Err(RecorderError::Stream("Input stream is closed".to_string()));
        }

        let mut samples = vec![0i16; self.chunk_size];
        let mut filled = 0;

        while filled < self.chunk_size {
            if self.interrupt.load(Ordering::Relaxed) {
                debug!("Chunk read interrupted with {} of {} samples", filled, self.chunk_size);
                return Ok(None);
            }

            if let Some(message) = self.failure.lock().take() {
                return Err(RecorderError::Stream(message));
            }

            let read = self.consumer.pop_slice(&mut samples[filled..]);
            if read == 0 {
                std::thread::sleep(READ_POLL_INTERVAL);
                continue;
            }
            filled += read;
        }

        Ok(Some(i16_to_le_bytes(&samples)))
    }

    fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("Failed to pause input stream: {}", e);
            }
            drop(stream);
            info!("Audio capture stopped");
        }
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.close();
    }
}
