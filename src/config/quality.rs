//! Audio quality presets.

use std::fmt;

use clap::ValueEnum;

/// Selectable audio quality, mapped to a capture sample rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Quality {
    /// 8000 Hz
    Low,
    /// 16000 Hz
    #[default]
    Medium,
    /// 44100 Hz
    High,
}

impl Quality {
    pub const ALL: [Quality; 3] = [Quality::Low, Quality::Medium, Quality::High];

    pub fn sample_rate(self) -> u32 {
        match self {
            Quality::Low => 8000,
            Quality::Medium => 16000,
            Quality::High => 44100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Quality::Low => "Low",
            Quality::Medium => "Medium",
            Quality::High => "High",
        }
    }

    /// Parse a label such as "low" or "High".
    pub fn parse(input: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(input.trim(), true).ok()
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} Hz)", self.label(), self.sample_rate())
    }
}
