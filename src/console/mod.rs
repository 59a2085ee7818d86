//! Interactive console front end.
//!
//! Reads one command per line from stdin and drives a [`Recorder`]. A 10 ms
//! tick moves captured chunks into the take and notices when playback ends.

mod command;
pub mod theme;

use std::future::Future;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub use command::Command;
use theme::{IDLE_GREEN, PLAYING_BLUE, RECORDING_RED, Role, Theme, paint};

use crate::config::Quality;
use crate::session::{Recorder, SessionEvent};
use crate::wav;

/// Interval between capture polls.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// What the recorder is doing, as shown on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Recording,
    Playing,
}

/// Console output for one command or tick.
#[derive(Debug, Default)]
pub struct Reply {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Reply {
    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }
}

/// Console state: the recorder plus presentation settings.
pub struct Console {
    recorder: Recorder,
    quality: Quality,
    theme: Theme,
    output_dir: PathBuf,
    color: bool,
    unsaved: bool,
}

impl Console {
    pub fn new(recorder: Recorder, quality: Quality, theme: Theme, output_dir: PathBuf, color: bool) -> Self {
        Self {
            recorder,
            quality,
            theme,
            output_dir,
            color,
            unsaved: false,
        }
    }

    pub fn status(&self) -> Status {
        if self.recorder.is_recording() {
            Status::Recording
        } else if self.recorder.is_playing() {
            Status::Playing
        } else {
            Status::Idle
        }
    }

    /// Parse and execute one line of input.
    pub fn handle_line(&mut self, line: &str) -> Reply {
        match Command::parse(line) {
            Ok(Some(command)) => self.handle(command),
            Ok(None) => Reply::default(),
            Err(message) => {
                let mut reply = Reply::default();
                reply.push(message);
                reply
            }
        }
    }

    pub fn handle(&mut self, command: Command) -> Reply {
        let mut reply = Reply::default();
        debug!("Console command: {:?}", command);

        match command {
            Command::Record => {
                if self.recorder.is_recording() {
                    self.stop_recording(&mut reply);
                } else {
                    self.start_recording(&mut reply);
                }
            }
            Command::Stop => {
                if self.recorder.is_recording() {
                    self.stop_recording(&mut reply);
                } else if self.recorder.is_playing() {
                    self.stop_playback(&mut reply);
                } else {
                    reply.push("Nothing to stop");
                }
            }
            Command::Play => {
                if self.recorder.is_playing() {
                    self.stop_playback(&mut reply);
                } else {
                    self.start_playback(&mut reply);
                }
            }
            Command::Save(path) => self.save(path.as_deref(), &mut reply),
            Command::Quality(None) => {
                let options: Vec<String> = Quality::ALL.iter().map(|q| q.to_string()).collect();
                reply.push(format!("Audio quality: {} (options: {})", self.quality, options.join(", ")));
            }
            Command::Quality(Some(quality)) => match self.recorder.set_sample_rate(quality.sample_rate()) {
                Ok(()) => {
                    self.quality = quality;
                    reply.push(format!("Audio quality: {}", quality));
                }
                Err(e) => reply.push(format!("Cannot change quality: {}", e)),
            },
            Command::Theme => {
                self.theme = self.theme.toggled();
                reply.push(self.settings_line());
                reply.push(self.status_line());
            }
            Command::Status => {
                reply.push(self.buttons_line());
                reply.push(self.settings_line());
                if self.recorder.has_take() {
                    let take = self.recorder.take_summary();
                    reply.push(format!("Last recording: {:.2}s at {} Hz ({} chunks)", take.duration.as_secs_f64(), take.sample_rate, take.chunks));
                }
                reply.push(self.status_line());
            }
            Command::Devices => match self.recorder.backend().list_devices() {
                Ok(devices) => {
                    for device in devices {
                        let marker = if device.is_default { "*" } else { " " };
                        reply.push(format!("{} {:<6} {}", marker, device.direction.to_string(), device.name));
                    }
                }
                Err(e) => reply.push(format!("Error: {}", e)),
            },
            Command::Help => {
                for (usage, description) in command::HELP {
                    reply.push(format!("  {:<30} {}", usage, description));
                }
            }
            Command::Quit => reply.quit = true,
        }

        reply
    }

    /// Poll the recorder and report anything that finished on its own.
    pub fn tick(&mut self) -> Reply {
        let mut reply = Reply::default();
        let was_recording = self.recorder.is_recording();

        match self.recorder.poll() {
            Ok(Some(SessionEvent::PlaybackFinished(_))) => {
                reply.push("Playback finished");
                reply.push(self.status_line());
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Session error: {}", e);
                if was_recording {
                    self.unsaved = true;
                    let take = self.recorder.take_summary();
                    reply.push(format!("Recording aborted: {} ({:.2}s kept)", e, take.duration.as_secs_f64()));
                } else {
                    reply.push(format!("Playback failed: {}", e));
                }
                reply.push(self.status_line());
            }
        }

        reply
    }

    /// Stop anything still running before exit.
    pub fn shutdown(&mut self) {
        if self.recorder.is_recording()
            && let Err(e) = self.recorder.stop_recording()
        {
            warn!("Recording ended with error: {}", e);
        }
        if let Err(e) = self.recorder.stop_playback() {
            warn!("Playback ended with error: {}", e);
        }
        if self.unsaved {
            warn!("Discarding unsaved recording");
        }
    }

    /// Run the console until `quit`, end of input, or `shutdown` resolves.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let (line_tx, mut line_rx) = mpsc::channel::<String>(16);

        // Blocking stdin reads live on their own thread so they never hold up runtime shutdown
        std::thread::Builder::new()
            .name("stdin".to_string())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    match line {
                        Ok(line) => {
                            if line_tx.blocking_send(line).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Failed to read stdin: {}", e);
                            break;
                        }
                    }
                }
            })
            .context("Failed to spawn stdin reader")?;

        let mut stdout = std::io::stdout();
        let mut banner = Reply::default();
        banner.push("Audio Recorder - type 'help' for commands");
        banner.push(self.buttons_line());
        banner.push(self.settings_line());
        banner.push(self.status_line());
        print_reply(&mut stdout, &banner)?;

        let mut tick = tokio::time::interval(POLL_INTERVAL);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                line = line_rx.recv() => match line {
                    Some(line) => {
                        let reply = self.handle_line(&line);
                        print_reply(&mut stdout, &reply)?;
                        if reply.quit {
                            break;
                        }
                    }
                    None => {
                        info!("Input closed");
                        break;
                    }
                },
                _ = tick.tick() => {
                    let reply = self.tick();
                    print_reply(&mut stdout, &reply)?;
                }
                _ = &mut shutdown => break,
            }
        }

        self.shutdown();
        Ok(())
    }

    fn start_recording(&mut self, reply: &mut Reply) {
        match self.recorder.start_recording() {
            Ok(()) => {
                self.unsaved = false;
                reply.push(format!("Recording at {}... type 'record' or 'stop' to finish", self.quality));
            }
            Err(e) => reply.push(format!("Cannot start recording: {}", e)),
        }
        reply.push(self.status_line());
    }

    fn stop_recording(&mut self, reply: &mut Reply) {
        self.unsaved = true;
        match self.recorder.stop_recording() {
            Ok(take) => reply.push(format!("Recorded {:.2}s ({} chunks)", take.duration.as_secs_f64(), take.chunks)),
            Err(e) => reply.push(format!("Recording ended with error: {}", e)),
        }
        reply.push(self.status_line());
    }

    fn start_playback(&mut self, reply: &mut Reply) {
        if !self.recorder.has_take() {
            reply.push("Nothing recorded yet");
            return;
        }
        let take = self.recorder.take_summary();
        match self.recorder.start_playback() {
            Ok(()) => reply.push(format!("Playing {:.2}s at {} Hz", take.duration.as_secs_f64(), take.sample_rate)),
            Err(e) => reply.push(format!("Cannot start playback: {}", e)),
        }
        reply.push(self.status_line());
    }

    fn stop_playback(&mut self, reply: &mut Reply) {
        match self.recorder.stop_playback() {
            Ok(Some(summary)) => reply.push(format!("Playback stopped after {} of {} chunks", summary.chunks_written, summary.total_chunks)),
            Ok(None) => reply.push("Nothing is playing"),
            Err(e) => reply.push(format!("Playback failed: {}", e)),
        }
        reply.push(self.status_line());
    }

    fn save(&mut self, path: Option<&Path>, reply: &mut Reply) {
        match self.save_to(path) {
            Ok(path) => {
                self.unsaved = false;
                reply.push(format!("File saved as {}", wav::display_name(&path)));
            }
            Err(e) => reply.push(format!("Save failed: {:#}", e)),
        }
    }

    fn save_to(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => wav::with_wav_extension(path),
            None => {
                std::fs::create_dir_all(&self.output_dir)
                    .with_context(|| format!("Failed to create output directory {}", self.output_dir.display()))?;
                self.output_dir.join(wav::default_file_name())
            }
        };
        self.recorder
            .export(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    fn status_line(&self) -> String {
        let (label, color) = match self.status() {
            Status::Idle => ("Idle", IDLE_GREEN),
            Status::Recording => ("Recording", RECORDING_RED),
            Status::Playing => ("Playing", PLAYING_BLUE),
        };
        paint(&format!("Status: {}", label), self.theme.accent(color), self.color)
    }

    fn settings_line(&self) -> String {
        let frame = paint(" Settings ", self.theme.style(Role::Frame), self.color);
        let body = format!(" Audio Quality: {}  Dark Mode: {} ", self.quality, if self.theme.is_dark() { "on" } else { "off" });
        format!("{}{}", frame, paint(&body, self.theme.style(Role::Label), self.color))
    }

    fn buttons_line(&self) -> String {
        let record = if self.recorder.is_recording() { "Stop Recording" } else { "Record" };
        let play = if self.recorder.is_playing() { "Stop Playing" } else { "Play" };

        let mut buttons = vec![paint(&format!("[{}]", record), self.theme.style(Role::Button), self.color)];
        // Play stays disabled until a recording has been made
        if self.recorder.has_take() {
            buttons.push(paint(&format!("[{}]", play), self.theme.style(Role::Button), self.color));
        } else {
            buttons.push(format!("({})", play));
        }
        buttons.push(paint("[Save]", self.theme.style(Role::Button), self.color));
        buttons.join(" ")
    }
}

fn print_reply(out: &mut impl Write, reply: &Reply) -> Result<()> {
    for line in &reply.lines {
        writeln!(out, "{}", line).context("Failed to write to stdout")?;
    }
    out.flush().context("Failed to flush stdout")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::memory::MemoryBackend;
    use std::sync::Arc;
    use std::time::Instant;
    use tempfile::tempdir;

    fn console(backend: &MemoryBackend, output_dir: &Path) -> Console {
        let recorder = Recorder::new(Arc::new(backend.clone()), Quality::Low.sample_rate());
        Console::new(recorder, Quality::Low, Theme::Light, output_dir.to_path_buf(), false)
    }

    fn chunks(count: usize) -> Vec<Vec<u8>> {
        (0..count).map(|i| vec![i as u8; 2048]).collect()
    }

    fn tick_until(console: &mut Console, done: impl Fn(&Console) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(console) {
            console.tick();
            assert!(Instant::now() < deadline, "timed out");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_record_toggle_and_save() {
        let dir = tempdir().unwrap();
        let backend = MemoryBackend::with_script(chunks(3));
        let mut console = console(&backend, dir.path());

        let reply = console.handle_line("record");
        assert_eq!(console.status(), Status::Recording);
        assert_eq!(reply.lines.last().unwrap(), "Status: Recording");

        tick_until(&mut console, |c| c.recorder.take_summary().chunks == 3);

        let reply = console.handle_line("record");
        assert_eq!(console.status(), Status::Idle);
        assert!(reply.lines[0].starts_with("Recorded 0.38s (3 chunks)"));

        let target = dir.path().join("take");
        let reply = console.handle(Command::Save(Some(target.clone())));
        assert_eq!(reply.lines, vec!["File saved as take.wav".to_string()]);
        assert_eq!(std::fs::metadata(dir.path().join("take.wav")).unwrap().len(), 6188);
    }

    #[test]
    fn test_save_without_path_uses_output_dir() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("recordings");
        let backend = MemoryBackend::default();
        let mut console = console(&backend, &output_dir);

        let reply = console.handle_line("save");
        assert!(reply.lines[0].starts_with("File saved as recording_"));

        let files: Vec<_> = std::fs::read_dir(&output_dir).unwrap().collect();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_play_requires_recording() {
        let dir = tempdir().unwrap();
        let backend = MemoryBackend::default();
        let mut console = console(&backend, dir.path());

        let reply = console.handle_line("play");
        assert_eq!(reply.lines, vec!["Nothing recorded yet".to_string()]);
        assert_eq!(backend.state().outputs_opened, 0);
    }

    #[test]
    fn test_play_then_stop() {
        let dir = tempdir().unwrap();
        let backend = MemoryBackend::with_script(chunks(20));
        let mut console = console(&backend, dir.path());

        console.handle_line("r");
        tick_until(&mut console, |c| c.recorder.take_summary().chunks == 20);
        console.handle_line("r");

        backend.state().write_delay = Duration::from_millis(20);
        console.handle_line("p");
        assert_eq!(console.status(), Status::Playing);

        let reply = console.handle_line("p");
        assert_eq!(console.status(), Status::Idle);
        assert!(reply.lines[0].starts_with("Playback stopped after"));
    }

    #[test]
    fn test_playback_finishes_on_tick() {
        let dir = tempdir().unwrap();
        let backend = MemoryBackend::with_script(chunks(2));
        let mut console = console(&backend, dir.path());

        console.handle_line("record");
        tick_until(&mut console, |c| c.recorder.take_summary().chunks == 2);
        console.handle_line("stop");
        console.handle_line("play");

        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let reply = console.tick();
            if reply.lines.first().map(String::as_str) == Some("Playback finished") {
                break;
            }
            assert!(Instant::now() < deadline, "playback never finished");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(console.status(), Status::Idle);
        assert_eq!(backend.state().written.len(), 2);
    }

    #[test]
    fn test_quality_locked_while_recording() {
        let dir = tempdir().unwrap();
        let backend = MemoryBackend::default();
        let mut console = console(&backend, dir.path());

        console.handle_line("record");
        let reply = console.handle_line("quality high");
        assert!(reply.lines[0].starts_with("Cannot change quality"));
        assert_eq!(console.quality, Quality::Low);

        console.handle_line("stop");
        let reply = console.handle_line("quality high");
        assert_eq!(reply.lines, vec!["Audio quality: High (44100 Hz)".to_string()]);
        assert_eq!(console.recorder.sample_rate(), 44100);
    }

    #[test]
    fn test_device_failure_reported() {
        let dir = tempdir().unwrap();
        let backend = MemoryBackend::default();
        backend.state().fail_open_input = true;
        let mut console = console(&backend, dir.path());

        let reply = console.handle_line("record");
        assert!(reply.lines[0].starts_with("Cannot start recording: Audio device unavailable"));
        assert_eq!(console.status(), Status::Idle);
    }

    #[test]
    fn test_theme_toggle() {
        let dir = tempdir().unwrap();
        let backend = MemoryBackend::default();
        let mut console = console(&backend, dir.path());

        let reply = console.handle_line("theme");
        assert!(console.theme.is_dark());
        assert!(reply.lines[0].contains("Dark Mode: on"));
    }

    #[test]
    fn test_buttons_reflect_state() {
        let dir = tempdir().unwrap();
        let backend = MemoryBackend::default();
        let mut console = console(&backend, dir.path());

        assert_eq!(console.buttons_line(), "[Record] (Play) [Save]");
        console.handle_line("record");
        assert_eq!(console.buttons_line(), "[Stop Recording] (Play) [Save]");
        console.handle_line("record");
        assert_eq!(console.buttons_line(), "[Record] [Play] [Save]");
    }

    #[test]
    fn test_devices_lists_defaults() {
        let dir = tempdir().unwrap();
        let backend = MemoryBackend::default();
        let mut console = console(&backend, dir.path());

        let reply = console.handle_line("devices");
        assert_eq!(reply.lines, vec!["* input  Memory microphone".to_string(), "* output Memory speaker".to_string()]);
    }

    #[test]
    fn test_quit_and_unknown() {
        let dir = tempdir().unwrap();
        let backend = MemoryBackend::default();
        let mut console = console(&backend, dir.path());

        assert!(console.handle_line("quit").quit);
        assert!(!console.handle_line("").quit);
        assert_eq!(console.handle_line("rewind").lines.len(), 1);
    }

    #[test]
    fn test_shutdown_stops_recording() {
        let dir = tempdir().unwrap();
        let backend = MemoryBackend::default();
        let mut console = console(&backend, dir.path());

        console.handle_line("record");
        console.shutdown();
        assert_eq!(console.status(), Status::Idle);
        assert_eq!(backend.state().inputs_closed, 1);
    }
}
