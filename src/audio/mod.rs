//! Audio I/O module: capture buffer, device streams and stream configuration.
//!
//! This module provides cross-platform capture and playback using cpal, with
//! resampling via rubato when the hardware cannot run at the session rate.

mod backend;
pub mod buffer;
mod capture;
pub mod device;
pub mod format;
#[cfg(test)]
pub mod memory;
mod playback;
pub mod resampler;
pub mod util;

pub use backend::CpalBackend;
pub use buffer::CaptureBuffer;
pub use device::{AudioBackend, DeviceInfo, Direction, InputStream, OutputStream};
pub use format::SessionConfig;
