//! Voice Recorder - record from the microphone, play it back, save it as WAV.
//!
//! Capture and playback go through cpal on the default devices; takes are kept
//! in memory as 16-bit mono chunks and exported with hound.

mod audio;
mod config;
mod console;
mod error;
mod session;
mod wav;

use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use audio::{AudioBackend, CpalBackend};
use config::AppConfig;
use console::Console;
use console::theme::Theme;
use session::Recorder;

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("🛑 Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("🛑 Received SIGTERM, shutting down...");
        }
    }
}

/// Record for a fixed time, save the take, and optionally play it back.
async fn run_one_shot(mut recorder: Recorder, output: &Path, seconds: f64, play_back: bool) -> Result<()> {
    let output = wav::with_wav_extension(output);
    let duration = Duration::from_secs_f64(seconds);

    recorder.start_recording().context("Failed to start recording")?;
    info!("🎤 Recording for {:.1}s...", seconds);

    let started = Instant::now();
    let mut tick = tokio::time::interval(Duration::from_millis(10));
    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    while started.elapsed() < duration {
        tokio::select! {
            _ = tick.tick() => {
                recorder.poll().context("Recording failed")?;
            }
            _ = &mut shutdown => break,
        }
    }

    let take = recorder.stop_recording().context("Recording failed")?;
    info!("Recorded {:.2}s ({} chunks, {} bytes)", take.duration.as_secs_f64(), take.chunks, take.bytes);

    recorder.export(&output).with_context(|| format!("Failed to write {}", output.display()))?;
    println!("File saved as {}", wav::display_name(&output));

    if play_back {
        recorder.start_playback().context("Failed to start playback")?;
        info!("🔊 Playing back...");
        tokio::task::block_in_place(|| recorder.wait_playback()).context("Playback failed")?;
    }

    Ok(())
}

fn list_devices(backend: &dyn AudioBackend) -> Result<()> {
    let devices = backend.list_devices().context("Failed to list audio devices")?;
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{} {:<6} {}", marker, device.direction.to_string(), device.name);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let config = AppConfig::from_args();

    // Respect RUST_LOG env var, fallback to verbose flag, default to info
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| if config.verbose { EnvFilter::try_new("debug") } else { EnvFilter::try_new("info") })
        .context("Invalid log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();

    info!("🎙️  Voice Recorder v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        std::process::exit(1);
    }

    let backend: Arc<dyn AudioBackend> = Arc::new(CpalBackend);

    if config.list_devices {
        return list_devices(backend.as_ref());
    }

    config.log_config();
    let recorder = Recorder::new(backend, config.quality.sample_rate());

    // clap ties --output to --record-for
    if let (Some(seconds), Some(output)) = (config.record_for, config.output.as_deref()) {
        return run_one_shot(recorder, output, seconds, config.play_back).await;
    }

    let color = std::io::stdout().is_terminal();
    let console = Console::new(recorder, config.quality, Theme::from_dark(config.dark), config.output_dir.clone(), color);
    console.run(wait_for_shutdown()).await?;

    info!("✅ Voice recorder stopped");
    Ok(())
}
