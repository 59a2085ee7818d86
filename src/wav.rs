//! WAV export for recorded takes.
//!
//! Frames are written as a canonical PCM WAV (RIFF header, `fmt ` chunk, `data`
//! chunk; 44 header bytes for 16-bit mono). The file is written to a temporary
//! file next to the target and renamed over it once complete, so a failed
//! export never leaves a truncated file at the destination.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use hound::WavWriter;
use tracing::{debug, info};

use crate::audio::SessionConfig;
use crate::error::{RecorderError, Result};

/// Default file extension for exported recordings.
pub const WAV_EXTENSION: &str = "wav";

/// Write `frames` (little-endian 16-bit PCM) to `path` as a WAV file, replacing any existing file.
pub fn export_wav(path: &Path, config: &SessionConfig, frames: &[u8]) -> Result<()> {
    let frame_bytes = config.channels as usize * config.sample_width as usize;
    if config.sample_width != 2 {
        return Err(RecorderError::InvalidFrames(format!("Unsupported sample width {} bytes", config.sample_width)));
    }
    if !frames.len().is_multiple_of(frame_bytes) {
        return Err(RecorderError::InvalidFrames(format!("{} bytes is not a whole number of {}-byte frames", frames.len(), frame_bytes)));
    }
    if u32::try_from(frames.len()).is_err() {
        return Err(RecorderError::InvalidFrames(format!("{} bytes exceeds the WAV size limit", frames.len())));
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new().prefix(".recording-").suffix(".wav.part").tempfile_in(dir)?;
    debug!("Writing {} bytes of frames to {}", frames.len(), temp.path().display());

    {
        let mut file = BufWriter::new(temp.as_file_mut());
        let mut writer = WavWriter::new(&mut file, config.wav_spec())?;
        for pair in frames.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([pair[0], pair[1]]))?;
        }
        writer.finalize()?;
        file.flush()?;
    }
    temp.as_file().sync_all()?;

    // Temp files are created owner-only; saved recordings get regular file permissions.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file().set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }

    temp.persist(path).map_err(|e| RecorderError::Io(e.error))?;

    info!("Saved {} ({} Hz, {} bytes of audio)", path.display(), config.sample_rate, frames.len());
    Ok(())
}

/// Append the `.wav` extension when the path has none.
pub fn with_wav_extension(path: impl Into<PathBuf>) -> PathBuf {
    let mut path = path.into();
    if path.extension().is_none() {
        path.set_extension(WAV_EXTENSION);
    }
    path
}

/// Timestamped file name for a take saved without an explicit name.
pub fn default_file_name() -> String {
    let now = time::OffsetDateTime::now_local().unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    let stamp = now
        .format(time::macros::format_description!("[year][month][day]_[hour][minute][second]"))
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    format!("recording_{}.{}", stamp, WAV_EXTENSION)
}

/// File name component used when reporting a saved file.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
