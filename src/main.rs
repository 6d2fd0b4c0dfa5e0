use std::process::ExitCode;

use anyhow::Context;
use raceclips::recorder::{DesktopBackend, RecorderConfig, ensure_ffmpeg_available};
use raceclips::sources::LiveSource;
use raceclips::{ClipsError, RaceMonitor, ScreenRecorder};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn print_suggestions(error: &ClipsError) {
    for suggestion in error.recovery_suggestions() {
        eprintln!("  - {}", suggestion);
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = ensure_ffmpeg_available() {
        error!("{}", e);
        print_suggestions(&e);
        return Ok(ExitCode::FAILURE);
    }

    let recorder = ScreenRecorder::new(RecorderConfig::default(), DesktopBackend::new());
    let mut monitor = RaceMonitor::new(LiveSource::new(), recorder);

    if let Err(e) = monitor.connect() {
        match &e {
            ClipsError::Connection { .. } => error!("iRacing is not running: {}", e),
            _ => error!("Failed to start: {}", e),
        }
        print_suggestions(&e);
        return Ok(ExitCode::FAILURE);
    }

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown requested");
                signal.cancel();
            }
            Err(e) => warn!("Cannot listen for Ctrl+C: {}", e),
        }
    });

    info!("Recording, press Ctrl+C to stop");
    let outcome = monitor.run(shutdown).await;
    let finished = monitor.disconnect();

    outcome.context("monitoring race events")?;
    if let Some(stats) = finished.context("finishing the recording")? {
        info!(
            path = %stats.output_path.display(),
            frames = stats.frames_written,
            "Recording saved"
        );
    }
    info!(events = monitor.events().len(), "Session complete");
    Ok(ExitCode::SUCCESS)
}
