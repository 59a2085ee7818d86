//! Console command parsing.

use std::path::PathBuf;

use crate::config::Quality;

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start recording, or stop the current recording
    Record,
    /// Stop whatever is running
    Stop,
    /// Start playback, or stop the current playback
    Play,
    /// Save the take, to the given path or a generated name
    Save(Option<PathBuf>),
    /// Show or change the quality for the next recording
    Quality(Option<Quality>),
    /// Toggle dark mode
    Theme,
    Status,
    Devices,
    Help,
    Quit,
}

pub const HELP: &[(&str, &str)] = &[
    ("record, r", "start recording / stop recording"),
    ("play, p", "play the last recording / stop playing"),
    ("stop", "stop recording or playback"),
    ("save, s [PATH]", "save the last recording as WAV"),
    ("quality, q [low|medium|high]", "show or set the audio quality"),
    ("theme, t", "toggle dark mode"),
    ("status", "show the current status"),
    ("devices", "list audio devices"),
    ("help, h", "show this help"),
    ("quit", "exit"),
];

impl Command {
    /// Parse a console line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let argument = (!rest.is_empty()).then_some(rest);

        let command = match word.to_ascii_lowercase().as_str() {
            "record" | "r" => Command::Record,
            "stop" => Command::Stop,
            "play" | "p" => Command::Play,
            "save" | "s" => Command::Save(argument.map(PathBuf::from)),
            "quality" | "q" => match argument {
                None => Command::Quality(None),
                Some(label) => {
                    let quality = Quality::parse(label).ok_or_else(|| format!("Unknown quality '{}' (expected low, medium or high)", label))?;
                    Command::Quality(Some(quality))
                }
            },
            "theme" | "t" | "dark" => Command::Theme,
            "status" => Command::Status,
            "devices" => Command::Devices,
            "help" | "h" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(format!("Unknown command '{}' (type 'help')", other)),
        };

        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line() {
        assert_eq!(Command::parse("   "), Ok(None));
    }

    #[test]
    fn test_aliases() {
        assert_eq!(Command::parse("r"), Ok(Some(Command::Record)));
        assert_eq!(Command::parse("PLAY"), Ok(Some(Command::Play)));
        assert_eq!(Command::parse("t"), Ok(Some(Command::Theme)));
        assert_eq!(Command::parse("exit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn test_save_path_keeps_spaces() {
        assert_eq!(Command::parse("save"), Ok(Some(Command::Save(None))));
        assert_eq!(Command::parse("save  my take.wav "), Ok(Some(Command::Save(Some(PathBuf::from("my take.wav"))))));
    }

    #[test]
    fn test_quality() {
        assert_eq!(Command::parse("quality"), Ok(Some(Command::Quality(None))));
        assert_eq!(Command::parse("q High"), Ok(Some(Command::Quality(Some(Quality::High)))));
        assert!(Command::parse("quality ultra").is_err());
    }

    #[test]
    fn test_unknown() {
        assert!(Command::parse("rewind").is_err());
    }
}
