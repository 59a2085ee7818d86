//! Error types for the recorder core.
//!
//! The audio and WAV layers return [`RecorderError`]; application code wraps it in `anyhow`.

use thiserror::Error;

/// Errors surfaced by the capture buffer, device adapters, session and WAV export.
#[derive(Debug, Error)]
pub enum RecorderError {
    /// No usable device, or the device rejected the requested configuration.
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// A running stream failed while reading or writing a chunk.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// File system failure during export.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV encoding failure during export.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Frame data that cannot be interpreted as 16-bit samples.
    #[error("Invalid frame data: {0}")]
    InvalidFrames(String),

    #[error("A recording is in progress")]
    RecordingActive,

    #[error("Playback is in progress")]
    PlaybackActive,
}

pub type Result<T> = std::result::Result<T, RecorderError>;
