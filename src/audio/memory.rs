//! In-memory [`AudioBackend`] for exercising the session without hardware.
//!
//! Input streams replay a scripted list of chunks and then behave like an idle
//! microphone (reads block until interrupted). Output streams record every
//! chunk written. Open/close counters let tests check device handle hygiene.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::device::{AudioBackend, DeviceInfo, Direction, InputStream, OutputStream};
use super::format::SessionConfig;
use crate::error::{RecorderError, Result};

#[derive(Debug, Default)]
pub struct MemoryState {
    pub script: VecDeque<Vec<u8>>,
    pub fail_open_input: bool,
    pub fail_open_output: bool,
    /// Fail the read after this many chunks have been delivered
    pub fail_read_after: Option<usize>,
    /// Fail the write after this many chunks have been accepted
    pub fail_write_after: Option<usize>,
    pub write_delay: Duration,
    /// Time queued audio takes to play out once all chunks are written
    pub drain_delay: Duration,
    pub reads: usize,
    pub written: Vec<Vec<u8>>,
    pub inputs_opened: usize,
    pub inputs_closed: usize,
    pub outputs_opened: usize,
    pub outputs_closed: usize,
    pub outputs_aborted: usize,
    pub last_output_config: Option<SessionConfig>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    pub state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    /// Backend whose microphone delivers `chunks` and then goes quiet.
    pub fn with_script(chunks: Vec<Vec<u8>>) -> Self {
        let backend = Self::default();
        backend.state.lock().script = chunks.into();
        backend
    }

    pub fn state(&self) -> parking_lot::MutexGuard<'_, MemoryState> {
        self.state.lock()
    }
}

impl AudioBackend for MemoryBackend {
    fn open_input(&self, _config: &SessionConfig) -> Result<Box<dyn InputStream>> {
        let mut state = self.state.lock();
        if state.fail_open_input {
            return Err(RecorderError::DeviceUnavailable("No input device available".to_string()));
        }
        state.inputs_opened += 1;
        Ok(Box::new(MemoryInput {
            state: self.state.clone(),
            interrupt: Arc::new(AtomicBool::new(false)),
            open: true,
        }))
    }

    fn open_output(&self, config: &SessionConfig) -> Result<Box<dyn OutputStream>> {
        let mut state = self.state.lock();
        if state.fail_open_output {
            return Err(RecorderError::DeviceUnavailable("No output device available".to_string()));
        }
        state.outputs_opened += 1;
        state.last_output_config = Some(*config);
        Ok(Box::new(MemoryOutput {
            state: self.state.clone(),
            open: true,
        }))
    }

    fn list_devices(&self) -> Result<Vec<DeviceInfo>> {
        Ok(vec![
            DeviceInfo { name: "Memory microphone".to_string(), direction: Direction::Input, is_default: true },
            DeviceInfo { name: "Memory speaker".to_string(), direction: Direction::Output, is_default: true },
        ])
    }
}

struct MemoryInput {
    state: Arc<Mutex<MemoryState>>,
    interrupt: Arc<AtomicBool>,
    open: bool,
}

impl InputStream for MemoryInput {
    fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            if self.interrupt.load(Ordering::SeqCst) {
                return Ok(None);
            }
            {
                let mut state = self.state.lock();
                if state.fail_read_after == Some(state.reads) {
                    return Err(RecorderError::Stream("Input overflowed".to_string()));
                }
                if let Some(chunk) = state.script.pop_front() {
                    state.reads += 1;
                    return Ok(Some(chunk));
                }
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.state.lock().inputs_closed += 1;
        }
    }
}

impl Drop for MemoryInput {
    fn drop(&mut self) {
        self.close();
    }
}

struct MemoryOutput {
    state: Arc<Mutex<MemoryState>>,
    open: bool,
}

impl OutputStream for MemoryOutput {
    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let delay = {
            let mut state = self.state.lock();
            if state.fail_write_after == Some(state.written.len()) {
                return Err(RecorderError::Stream("Output underflowed".to_string()));
            }
            state.written.push(chunk.to_vec());
            state.write_delay
        };
        std::thread::sleep(delay);
        Ok(())
    }

    fn drain(&mut self, cancel: &AtomicBool) -> bool {
        let deadline = Instant::now() + self.state.lock().drain_delay;
        while Instant::now() < deadline {
            if cancel.load(Ordering::SeqCst) {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        !cancel.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.state.lock().outputs_closed += 1;
        }
    }

    fn abort(&mut self) {
        if self.open {
            self.open = false;
            let mut state = self.state.lock();
            state.outputs_closed += 1;
            state.outputs_aborted += 1;
        }
    }
}

impl Drop for MemoryOutput {
    fn drop(&mut self) {
        self.close();
    }
}
