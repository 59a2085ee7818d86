//! Device abstraction used by the recorder session.
//!
//! A backend opens input and output streams for a [`SessionConfig`]. Streams are
//! opened, used and closed on the worker thread that owns them, so they are not
//! required to be `Send`.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use super::format::SessionConfig;
use crate::error::Result;

/// Direction of an audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// A device reported by [`AudioBackend::list_devices`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub direction: Direction,
    pub is_default: bool,
}

/// Source of input and output streams.
pub trait AudioBackend: Send + Sync + 'static {
    /// Open a capture stream for `config`.
    ///
    /// Fails with `DeviceUnavailable` if there is no input device or the
    /// hardware offers no usable configuration.
    fn open_input(&self, config: &SessionConfig) -> Result<Box<dyn InputStream>>;

    /// Open a playback stream for `config`.
    fn open_output(&self, config: &SessionConfig) -> Result<Box<dyn OutputStream>>;

    /// Enumerate the devices of the backend.
    fn list_devices(&self) -> Result<Vec<DeviceInfo>>;
}

/// An open capture stream.
///
/// `close` releases the device and is idempotent; implementations also close on drop,
/// so the device is released exactly once on every exit path.
pub trait InputStream {
    /// Block until one full chunk is available and return it as little-endian i16 bytes.
    ///
    /// Returns `Ok(None)` once the interrupt flag is raised; a partially filled chunk is discarded.
    fn read_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Flag that makes a pending or future [`read_chunk`](Self::read_chunk) return `Ok(None)`.
    fn interrupt_flag(&self) -> Arc<AtomicBool>;

    fn close(&mut self);
}

/// An open playback stream.
///
/// `close` and `abort` are idempotent and implementations close on drop.
pub trait OutputStream {
    /// Queue one chunk of little-endian i16 bytes, blocking while the device buffer is full.
    fn write_chunk(&mut self, chunk: &[u8]) -> Result<()>;

    /// Wait for queued audio to finish playing.
    ///
    /// Returns `false` as soon as `cancel` is raised; the queued audio is left
    /// for [`abort`](Self::abort) to discard.
    fn drain(&mut self, cancel: &AtomicBool) -> bool;

    /// Wait for queued audio to finish playing, then release the device.
    fn close(&mut self);

    /// Discard queued audio and release the device immediately.
    fn abort(&mut self);
}
