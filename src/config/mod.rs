//! Configuration module for the recorder.
//!
//! Provides CLI argument parsing and the audio quality presets.

#[allow(clippy::module_inception)]
mod config;
mod quality;

pub use config::AppConfig;
pub use quality::Quality;
