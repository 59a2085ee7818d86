//! Application configuration and CLI argument parsing.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use super::quality::Quality;

/// Recorder startup options. Nothing is persisted between runs.
#[derive(Parser, Debug, Clone)]
#[command(name = "voice-recorder")]
#[command(author, version, about = "Record from the microphone, play it back and save it as WAV", long_about = None)]
pub struct AppConfig {
    /// Initial audio quality (sample rate) for recordings
    #[arg(long, short = 'q', value_enum, default_value = "medium")]
    pub quality: Quality,

    /// Start with the dark theme
    #[arg(long)]
    pub dark: bool,

    /// Directory for recordings saved without an explicit path
    #[arg(long, short = 'o', default_value_os_t = default_output_dir())]
    pub output_dir: PathBuf,

    /// Record for this many seconds, save to --output and exit (no console)
    #[arg(long, value_name = "SECS", requires = "output")]
    pub record_for: Option<f64>,

    /// Target WAV file for --record-for
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Play the take back after a --record-for recording
    #[arg(long, requires = "record_for")]
    pub play_back: bool,

    /// List audio devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl AppConfig {
    /// Parse configuration from command line arguments.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(seconds) = self.record_for
            && !(seconds.is_finite() && seconds > 0.0)
        {
            anyhow::bail!("--record-for must be a positive number of seconds, got {}", seconds);
        }

        if self.output_dir.exists() && !self.output_dir.is_dir() {
            anyhow::bail!("Output directory is not a directory: {}", self.output_dir.display());
        }

        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Quality: {}", self.quality);
        info!("  Theme: {}", if self.dark { "dark" } else { "light" });
        info!("  Output directory: {}", self.output_dir.display());
        if let (Some(seconds), Some(output)) = (self.record_for, &self.output) {
            info!("  One-shot recording: {}s -> {}", seconds, output.display());
        }
    }
}

/// Get the default output directory (the user's audio directory, else the working directory).
fn default_output_dir() -> PathBuf {
    dirs::audio_dir().unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::try_parse_from(["voice-recorder"]).unwrap();
        assert_eq!(config.quality, Quality::Medium);
        assert!(!config.dark);
        assert!(config.record_for.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_quality_flag() {
        let config = AppConfig::try_parse_from(["voice-recorder", "--quality", "low", "--dark"]).unwrap();
        assert_eq!(config.quality, Quality::Low);
        assert!(config.dark);
    }

    #[test]
    fn test_record_for_requires_output() {
        assert!(AppConfig::try_parse_from(["voice-recorder", "--record-for", "2"]).is_err());

        let config = AppConfig::try_parse_from(["voice-recorder", "--record-for", "2", "--output", "take.wav"]).unwrap();
        assert_eq!(config.record_for, Some(2.0));
        config.validate().unwrap();
    }

    #[test]
    fn test_record_for_must_be_positive() {
        let config = AppConfig::try_parse_from(["voice-recorder", "--record-for", "0", "--output", "take.wav"]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_output_dir_must_be_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = AppConfig::try_parse_from(["voice-recorder", "--output-dir", file.path().to_str().unwrap()]).unwrap();
        assert!(config.validate().is_err());
    }
}
