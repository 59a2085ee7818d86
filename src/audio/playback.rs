//! Audio playback using cpal.
//!
//! Chunks written by the session are decoded to f32, resampled to the device
//! rate when needed and queued in a lock-free ring buffer that the device
//! callback drains. Writes block while the ring buffer is full.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use parking_lot::Mutex;
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use tracing::{debug, info, warn};

use super::device::OutputStream;
use super::format::SessionConfig;
use super::resampler::ResamplerState;
use super::util::{find_best_config, get_device_name, le_bytes_to_f32};
use crate::error::{RecorderError, Result};

/// Size of the playback ring buffer in samples (~1.4 seconds at 48kHz).
const PLAYBACK_RING_SIZE: usize = 65536;

/// Sleep between attempts to queue samples into a full ring buffer.
const WRITE_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Sleep between checks while waiting for queued audio to play out.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Extra time allowed for the device to play out its own buffers on close.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Speaker stream on the default output device.
pub struct CpalOutput {
    /// None once closed
    stream: Option<Stream>,
    /// Sample rate of the audio device
    device_sample_rate: u32,
    /// Ring buffer producer for queued mono samples
    producer: ringbuf::HeapProd<f32>,
    /// Session rate -> device rate conversion, when they differ
    resampler: Option<Arc<Mutex<ResamplerState>>>,
    /// Makes the callback output silence and drop queued samples
    silenced: Arc<AtomicBool>,
    /// Error reported by the device callback
    failure: Arc<Mutex<Option<String>>>,
}

impl CpalOutput {
    /// Open and start the default output device for `config`.
    ///
    /// # Errors
    /// Returns `DeviceUnavailable` if:
    /// - No output device is available
    /// - Failed to get supported output configurations
    /// - Failed to build or start the output stream
    pub fn open(config: &SessionConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| RecorderError::DeviceUnavailable("No output device available".to_string()))?;

        info!("Using output device: {}", get_device_name(&device));

        let supported_configs = device
            .supported_output_configs()
            .map_err(|e| RecorderError::DeviceUnavailable(format!("Failed to get supported output configs: {e}")))?;

        let device_config = find_best_config(supported_configs, config.sample_rate)?;
        let device_sample_rate = device_config.sample_rate();
        let channels = device_config.channels() as usize;

        let resampler = if device_sample_rate != config.sample_rate {
            info!("Device sample rate {} Hz differs from session {} Hz - resampling will be applied", device_sample_rate, config.sample_rate);
            Some(ResamplerState::new(config.sample_rate, device_sample_rate)?)
        } else {
            None
        };

        debug!("Audio playback config: {} Hz, {} channels, {:?}", device_sample_rate, channels, device_config.sample_format());

        let ring = HeapRb::<f32>::new(PLAYBACK_RING_SIZE);
        let (producer, mut consumer) = ring.split();

        let silenced = Arc::new(AtomicBool::new(false));
        let silenced_clone = silenced.clone();

        let failure = Arc::new(Mutex::new(None));
        let failure_clone = failure.clone();
        let err_fn = move |err: cpal::StreamError| {
            tracing::error!("Audio playback error: {}", err);
            let mut slot = failure_clone.lock();
            if slot.is_none() {
                *slot = Some(err.to_string());
            }
        };

        let stream_config: StreamConfig = device_config.config();

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if silenced_clone.load(Ordering::Relaxed) {
                        consumer.clear();
                        data.fill(0.0);
                        return;
                    }

                    for frame in data.chunks_mut(channels) {
                        // Duplicate mono sample to all channels, silence on underrun
                        let sample = consumer.try_pop().unwrap_or(0.0);
                        frame.fill(sample);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| RecorderError::DeviceUnavailable(format!("Failed to build output stream: {e}")))?;

        stream
            .play()
            .map_err(|e| RecorderError::DeviceUnavailable(format!("Failed to start playback stream: {e}")))?;

        info!("Audio playback started: session {} Hz -> device {} Hz", config.sample_rate, device_sample_rate);

        Ok(Self {
            stream: Some(stream),
            device_sample_rate,
            producer,
            resampler,
            silenced,
            failure,
        })
    }

    fn check_failure(&self) -> Result<()> {
        match self.failure.lock().take() {
            Some(message) => Err(RecorderError::Stream(message)),
            None => Ok(()),
        }
    }

    /// Queue samples, blocking until the ring buffer has taken all of them.
    ///
    /// Returns `Ok(false)` if `cancel` is raised while waiting for room.
    fn queue(&mut self, samples: &[f32], cancel: Option<&AtomicBool>) -> Result<bool> {
        let mut pushed = 0;
        while pushed < samples.len() {
            pushed += self.producer.push_slice(&samples[pushed..]);
            if pushed < samples.len() {
                self.check_failure()?;
                if cancel.is_some_and(|flag| flag.load(Ordering::SeqCst)) {
                    return Ok(false);
                }
                std::thread::sleep(WRITE_POLL_INTERVAL);
            }
        }
        Ok(true)
    }
}

impl OutputStream for CpalOutput {
    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        if self.stream.is_none() {
            return Err(RecorderError::Stream("Output stream is closed".to_string()));
        }
        self.check_failure()?;

        let samples = le_bytes_to_f32(chunk);
        let samples = match &self.resampler {
            Some(state) => state.lock().process_samples(&samples),
            None => samples,
        };
        self.queue(&samples, None).map(|_| ())
    }

    fn drain(&mut self, cancel: &AtomicBool) -> bool {
        if self.stream.is_none() {
            return true;
        }

        if let Some(state) = self.resampler.take() {
            let tail = state.lock().flush();
            match self.queue(&tail, Some(cancel)) {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => debug!("Failed to queue resampler tail: {}", e),
            }
        }

        let queued = self.producer.occupied_len();
        let timeout = Duration::from_secs_f64(queued as f64 / self.device_sample_rate as f64 + 1.0);
        let deadline = Instant::now() + timeout;

        while !self.producer.is_empty() {
            if cancel.load(Ordering::SeqCst) {
                debug!("Playback drain cancelled, {} samples left", self.producer.occupied_len());
                return false;
            }
            if Instant::now() > deadline {
                warn!("Playback drain timeout exceeded, {} samples left", self.producer.occupied_len());
                return true;
            }
            if self.failure.lock().is_some() {
                return true;
            }
            std::thread::sleep(DRAIN_POLL_INTERVAL);
        }

        std::thread::sleep(DRAIN_GRACE);
        !cancel.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        if self.stream.is_none() {
            return;
        }

        self.drain(&AtomicBool::new(false));

        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("Failed to pause output stream: {}", e);
            }
            drop(stream);
            info!("Audio playback stopped");
        }
    }

    fn abort(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.silenced.store(true, Ordering::SeqCst);
            if let Err(e) = stream.pause() {
                debug!("Failed to pause output stream: {}", e);
            }
            drop(stream);
            info!("Audio playback aborted");
        }
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.abort();
    }
}
