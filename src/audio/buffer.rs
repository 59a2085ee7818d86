//! In-memory frame buffer for one recording take.
//!
//! Chunks are appended in capture order while a recording is open and become
//! read-only once it is finished. Misuse (appending outside a recording,
//! resetting or snapshotting during one) is a programming error and panics.

use std::time::Duration;

use super::format::SessionConfig;

/// Append-only list of fixed-size raw audio chunks.
#[derive(Debug)]
pub struct CaptureBuffer {
    config: SessionConfig,
    chunks: Vec<Vec<u8>>,
    recording: bool,
}

impl CaptureBuffer {
    /// Create an empty buffer for the given session configuration.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            chunks: Vec::new(),
            recording: false,
        }
    }

    /// Configuration the current take was (or will be) recorded with.
    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Discard all frames. Must not be called while recording.
    pub fn reset(&mut self) {
        assert!(!self.recording, "capture buffer reset while recording");
        self.chunks.clear();
    }

    /// Discard all frames and switch to a new configuration for the next take.
    pub fn reset_with(&mut self, config: SessionConfig) {
        self.reset();
        self.config = config;
    }

    /// Open the recording window; appends are accepted until [`finish`](Self::finish).
    pub fn begin(&mut self) {
        assert!(!self.recording, "capture buffer already recording");
        self.recording = true;
    }

    /// Close the recording window and freeze the contents.
    pub fn finish(&mut self) {
        self.recording = false;
    }

    /// Append one chunk. The chunk must be exactly one chunk long.
    pub fn append(&mut self, chunk: Vec<u8>) {
        assert!(self.recording, "capture buffer append outside a recording");
        assert_eq!(chunk.len(), self.config.chunk_bytes(), "chunk length must equal the configured chunk size");
        self.chunks.push(chunk);
    }

    /// All chunks concatenated in insertion order. Must not be called while recording.
    pub fn snapshot(&self) -> Vec<u8> {
        assert!(!self.recording, "capture buffer snapshot while recording");
        self.chunks.concat()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn len_bytes(&self) -> usize {
        self.chunks.len() * self.config.chunk_bytes()
    }

    /// Audio duration held in the buffer.
    pub fn duration(&self) -> Duration {
        self.config.duration_of(self.len_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(config: &SessionConfig, fill: u8) -> Vec<u8> {
        vec![fill; config.chunk_bytes()]
    }

    #[test]
    fn test_snapshot_preserves_append_order() {
        let config = SessionConfig::new(16000);
        let mut buffer = CaptureBuffer::new(config);
        buffer.begin();
        for fill in 0..5u8 {
            buffer.append(chunk(&config, fill));
        }
        buffer.finish();

        let data = buffer.snapshot();
        assert_eq!(data.len(), 5 * config.chunk_bytes());
        for (i, part) in data.chunks(config.chunk_bytes()).enumerate() {
            assert!(part.iter().all(|&b| b == i as u8));
        }
        assert_eq!(buffer.chunk_count(), 5);
        assert_eq!(buffer.len_bytes(), data.len());
    }

    #[test]
    fn test_reset_then_snapshot_is_empty() {
        let config = SessionConfig::new(8000);
        let mut buffer = CaptureBuffer::new(config);
        buffer.begin();
        buffer.append(chunk(&config, 7));
        buffer.finish();

        buffer.reset();
        assert_eq!(buffer.chunk_count(), 0);
        assert!(buffer.snapshot().is_empty());
        assert_eq!(buffer.duration(), Duration::ZERO);
    }

    #[test]
    fn test_reset_with_switches_config() {
        let mut buffer = CaptureBuffer::new(SessionConfig::new(8000));
        buffer.reset_with(SessionConfig::new(44100));
        assert_eq!(buffer.config().sample_rate, 44100);
    }

    #[test]
    fn test_duration_tracks_chunks() {
        let config = SessionConfig::new(8000);
        let mut buffer = CaptureBuffer::new(config);
        buffer.begin();
        for _ in 0..3 {
            buffer.append(chunk(&config, 0));
        }
        buffer.finish();
        assert_eq!(buffer.duration(), Duration::from_millis(384));
    }

    #[test]
    #[should_panic(expected = "append outside a recording")]
    fn test_append_when_not_recording_panics() {
        let config = SessionConfig::new(8000);
        let mut buffer = CaptureBuffer::new(config);
        buffer.append(chunk(&config, 0));
    }

    #[test]
    #[should_panic(expected = "reset while recording")]
    fn test_reset_while_recording_panics() {
        let mut buffer = CaptureBuffer::new(SessionConfig::new(8000));
        buffer.begin();
        buffer.reset();
    }

    #[test]
    #[should_panic(expected = "snapshot while recording")]
    fn test_snapshot_while_recording_panics() {
        let mut buffer = CaptureBuffer::new(SessionConfig::new(8000));
        buffer.begin();
        let _ = buffer.snapshot();
    }

    #[test]
    #[should_panic(expected = "chunk length")]
    fn test_short_chunk_panics() {
        let mut buffer = CaptureBuffer::new(SessionConfig::new(8000));
        buffer.begin();
        buffer.append(vec![0; 10]);
    }
}
