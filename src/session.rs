//! Recorder session: record, play back and export one take at a time.
//!
//! Capture runs on a worker thread that owns the input stream and hands each
//! chunk over a bounded channel; [`Recorder::poll`] moves them into the
//! [`CaptureBuffer`]. Playback runs on a second worker thread that writes the
//! frozen take chunk by chunk and checks a cancellation flag between chunks
//! and while the queued tail plays out, so stopping playback takes effect after
//! the chunk in flight and discards whatever the device still has queued.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::audio::{AudioBackend, CaptureBuffer, InputStream, OutputStream, SessionConfig};
use crate::error::{RecorderError, Result};
use crate::wav;

/// Chunks that may wait in the capture channel before the worker blocks.
const CAPTURE_CHANNEL_CAPACITY: usize = 64;

/// Message from the capture worker.
enum CaptureEvent {
    Chunk(Vec<u8>),
    Failed(RecorderError),
}

struct CaptureWorker {
    interrupt: Arc<AtomicBool>,
    receiver: Receiver<CaptureEvent>,
    handle: JoinHandle<()>,
}

struct PlaybackWorker {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<Result<PlaybackSummary>>,
}

/// Description of the current take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TakeSummary {
    pub chunks: usize,
    pub bytes: usize,
    pub duration: Duration,
    pub sample_rate: u32,
}

/// Outcome of a playback run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub chunks_written: usize,
    pub total_chunks: usize,
    pub cancelled: bool,
}

/// Something the session finished on its own, reported by [`Recorder::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    PlaybackFinished(PlaybackSummary),
}

/// One recorder: the current take, its configuration and the running workers.
pub struct Recorder {
    backend: Arc<dyn AudioBackend>,
    next_config: SessionConfig,
    buffer: CaptureBuffer,
    capture: Option<CaptureWorker>,
    playback: Option<PlaybackWorker>,
    has_take: bool,
}

impl Recorder {
    /// Create an idle recorder whose first take will use `sample_rate`.
    pub fn new(backend: Arc<dyn AudioBackend>, sample_rate: u32) -> Self {
        let config = SessionConfig::new(sample_rate);
        Self {
            backend,
            next_config: config,
            buffer: CaptureBuffer::new(config),
            capture: None,
            playback: None,
            has_take: false,
        }
    }

    pub fn backend(&self) -> &Arc<dyn AudioBackend> {
        &self.backend
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    /// Whether a recording has been completed (the take may still be empty).
    pub fn has_take(&self) -> bool {
        self.has_take
    }

    /// Sample rate the next recording will use.
    pub fn sample_rate(&self) -> u32 {
        self.next_config.sample_rate
    }

    /// Select the sample rate for the next recording. Refused while recording.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> Result<()> {
        if self.is_recording() {
            return Err(RecorderError::RecordingActive);
        }
        self.next_config = SessionConfig::new(sample_rate);
        debug!("Next recording will use {} Hz", sample_rate);
        Ok(())
    }

    /// Configuration of the current take.
    pub fn take_config(&self) -> SessionConfig {
        self.buffer.config()
    }

    pub fn take_summary(&self) -> TakeSummary {
        TakeSummary {
            chunks: self.buffer.chunk_count(),
            bytes: self.buffer.len_bytes(),
            duration: self.buffer.duration(),
            sample_rate: self.buffer.config().sample_rate,
        }
    }

    /// Open the input device, discard the previous take and start capturing.
    ///
    /// If the device cannot be opened the previous take is kept and the recorder stays idle.
    pub fn start_recording(&mut self) -> Result<()> {
        if self.is_recording() {
            return Err(RecorderError::RecordingActive);
        }
        if self.is_playing() {
            return Err(RecorderError::PlaybackActive);
        }

        let config = self.next_config;
        let worker = spawn_capture(self.backend.clone(), config)?;

        self.buffer.reset_with(config);
        self.buffer.begin();
        self.capture = Some(worker);
        info!("Recording started at {} Hz", config.sample_rate);
        Ok(())
    }

    /// Stop capturing, close the input device and freeze the take.
    ///
    /// Chunks that completed before the stop are kept. Without an active recording
    /// this only reports the current take.
    pub fn stop_recording(&mut self) -> Result<TakeSummary> {
        let Some(worker) = self.capture.take() else {
            return Ok(self.take_summary());
        };

        let failure = self.finish_capture(worker);
        self.buffer.finish();
        self.has_take = true;

        let summary = self.take_summary();
        info!("Recording stopped: {} chunks, {:.2}s", summary.chunks, summary.duration.as_secs_f64());

        match failure {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Move captured chunks into the buffer and reap a finished playback.
    ///
    /// A capture failure ends the recording (the device is already closed) and is
    /// returned; chunks captured before the failure are kept. A playback failure
    /// is returned once the playback worker has exited.
    pub fn poll(&mut self) -> Result<Option<SessionEvent>> {
        if let Some(worker) = &self.capture {
            let mut failure = None;
            loop {
                match worker.receiver.try_recv() {
                    Ok(CaptureEvent::Chunk(chunk)) => self.buffer.append(chunk),
                    Ok(CaptureEvent::Failed(e)) => {
                        failure = Some(e);
                        break;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        failure = Some(RecorderError::Stream("Capture thread exited unexpectedly".to_string()));
                        break;
                    }
                }
            }

            if let Some(e) = failure {
                error!("Recording aborted: {}", e);
                if let Some(worker) = self.capture.take() {
                    self.finish_capture(worker);
                }
                self.buffer.finish();
                self.has_take = true;
                return Err(e);
            }
        }

        if let Some(worker) = self.playback.take_if(|p| p.handle.is_finished()) {
            let summary = join_playback(worker)?;
            return Ok(Some(SessionEvent::PlaybackFinished(summary)));
        }

        Ok(None)
    }

    /// Start playing the current take on the default output device.
    pub fn start_playback(&mut self) -> Result<()> {
        if self.is_recording() {
            return Err(RecorderError::RecordingActive);
        }
        if self.is_playing() {
            return Err(RecorderError::PlaybackActive);
        }

        let config = self.buffer.config();
        let frames = self.buffer.snapshot();
        let total_chunks = self.buffer.chunk_count();

        self.playback = Some(spawn_playback(self.backend.clone(), config, frames)?);
        info!("Playback started: {} chunks at {} Hz", total_chunks, config.sample_rate);
        Ok(())
    }

    /// Cancel playback after the chunk in flight and close the output device.
    ///
    /// Returns `None` if nothing was playing.
    pub fn stop_playback(&mut self) -> Result<Option<PlaybackSummary>> {
        let Some(worker) = self.playback.take() else {
            return Ok(None);
        };
        worker.cancel.store(true, Ordering::SeqCst);
        join_playback(worker).map(Some)
    }

    /// Block until the current playback ends on its own.
    pub fn wait_playback(&mut self) -> Result<Option<PlaybackSummary>> {
        match self.playback.take() {
            Some(worker) => join_playback(worker).map(Some),
            None => Ok(None),
        }
    }

    /// Write the current take to `path` as a WAV file.
    pub fn export(&self, path: &Path) -> Result<()> {
        if self.is_recording() {
            return Err(RecorderError::RecordingActive);
        }
        wav::export_wav(path, &self.buffer.config(), &self.buffer.snapshot())
    }

    /// Interrupt the capture worker, collect the chunks it already produced and join it.
    fn finish_capture(&mut self, worker: CaptureWorker) -> Option<RecorderError> {
        worker.interrupt.store(true, Ordering::SeqCst);

        // Draining also unblocks a worker waiting on a full channel
        let mut failure = None;
        for event in worker.receiver.iter() {
            match event {
                CaptureEvent::Chunk(chunk) => self.buffer.append(chunk),
                CaptureEvent::Failed(e) => failure = Some(e),
            }
        }

        if worker.handle.join().is_err() {
            warn!("Capture thread panicked");
            if failure.is_none() {
                failure = Some(RecorderError::Stream("Capture thread panicked".to_string()));
            }
        }
        failure
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(worker) = self.capture.take() {
            self.finish_capture(worker);
            self.buffer.finish();
        }
        if let Err(e) = self.stop_playback() {
            debug!("Playback ended with error during shutdown: {}", e);
        }
    }
}

/// Spawn the capture worker and wait until it has opened the input device.
fn spawn_capture(backend: Arc<dyn AudioBackend>, config: SessionConfig) -> Result<CaptureWorker> {
    let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<Arc<AtomicBool>>>(1);
    let (sender, receiver) = mpsc::sync_channel::<CaptureEvent>(CAPTURE_CHANNEL_CAPACITY);

    let handle = thread::Builder::new().name("capture".to_string()).spawn(move || {
        let mut input = match backend.open_input(&config) {
            Ok(input) => input,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return;
            }
        };
        if ready_tx.send(Ok(input.interrupt_flag())).is_err() {
            input.close();
            return;
        }

        run_capture_loop(input.as_mut(), &sender);
        input.close();
        debug!("Capture thread exiting");
    })?;

    match ready_rx.recv() {
        Ok(Ok(interrupt)) => Ok(CaptureWorker { interrupt, receiver, handle }),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = handle.join();
            Err(RecorderError::Stream("Capture thread exited before opening the device".to_string()))
        }
    }
}

/// Read chunks until interrupted, the receiver goes away, or a read fails.
fn run_capture_loop(input: &mut dyn InputStream, sender: &SyncSender<CaptureEvent>) {
    loop {
        match input.read_chunk() {
            Ok(Some(chunk)) => {
                if sender.send(CaptureEvent::Chunk(chunk)).is_err() {
                    debug!("Capture channel closed");
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                let _ = sender.send(CaptureEvent::Failed(e));
                return;
            }
        }
    }
}

/// Spawn the playback worker and wait until it has opened the output device.
fn spawn_playback(backend: Arc<dyn AudioBackend>, config: SessionConfig, frames: Vec<u8>) -> Result<PlaybackWorker> {
    let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);
    let cancel = Arc::new(AtomicBool::new(false));
    let worker_cancel = cancel.clone();

    let handle = thread::Builder::new().name("playback".to_string()).spawn(move || {
        let mut output = match backend.open_output(&config) {
            Ok(output) => output,
            Err(e) => {
                let _ = ready_tx.send(Err(e));
                return Err(RecorderError::DeviceUnavailable("Output device did not open".to_string()));
            }
        };
        let _ = ready_tx.send(Ok(()));

        run_playback_loop(output.as_mut(), &frames, config.chunk_bytes(), &worker_cancel)
    })?;

    match ready_rx.recv() {
        Ok(Ok(())) => Ok(PlaybackWorker { cancel, handle }),
        Ok(Err(e)) => {
            let _ = handle.join();
            Err(e)
        }
        Err(_) => {
            let _ = handle.join();
            Err(RecorderError::Stream("Playback thread exited before opening the device".to_string()))
        }
    }
}

/// Write chunks in capture order, checking `cancel` before each one and while
/// the queued tail plays out.
///
/// The output is aborted on cancellation or failure and closed (drained) otherwise.
fn run_playback_loop(output: &mut dyn OutputStream, frames: &[u8], chunk_bytes: usize, cancel: &AtomicBool) -> Result<PlaybackSummary> {
    let total_chunks = frames.len().div_ceil(chunk_bytes);
    let mut chunks_written = 0;
    let mut cancelled = false;

    for chunk in frames.chunks(chunk_bytes) {
        if cancel.load(Ordering::SeqCst) {
            cancelled = true;
            break;
        }
        if let Err(e) = output.write_chunk(chunk) {
            output.abort();
            return Err(e);
        }
        chunks_written += 1;
    }

    if !cancelled && !output.drain(cancel) {
        cancelled = true;
    }

    if cancelled {
        output.abort();
    } else {
        output.close();
    }

    debug!("Playback wrote {}/{} chunks", chunks_written, total_chunks);
    Ok(PlaybackSummary {
        chunks_written,
        total_chunks,
        cancelled,
    })
}

fn join_playback(worker: PlaybackWorker) -> Result<PlaybackSummary> {
    match worker.handle.join() {
        Ok(result) => {
            if let Ok(summary) = &result {
                info!("Playback finished: {}/{} chunks{}", summary.chunks_written, summary.total_chunks, if summary.cancelled { " (stopped)" } else { "" });
            }
            result
        }
        Err(_) => Err(RecorderError::Stream("Playback thread panicked".to_string())),
    }
}
