//! Background screen recording.
//!
//! [`ScreenRecorder`] owns at most one worker thread. The worker opens the
//! display grabber and the video sink itself, captures at a fixed rate until
//! it is cancelled, and always finalizes the sink before exiting.
//!
//! ```rust,no_run
//! use raceclips::recorder::{DesktopBackend, RecorderConfig, ScreenRecorder};
//!
//! # fn main() -> raceclips::Result<()> {
//! let mut recorder = ScreenRecorder::new(RecorderConfig::default(), DesktopBackend::new());
//! recorder.start_recording()?;
//! std::thread::sleep(std::time::Duration::from_secs(5));
//! let stats = recorder.stop_recording()?;
//! println!("{} frames written", stats.frames_written);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod encoder;
pub mod frame;
pub mod pacing;

pub use capture::{CaptureBackend, DesktopBackend, FrameGrabber};
pub use encoder::{FFMPEG, FfmpegWriter, FourCc, VideoSettings, VideoSink, ensure_ffmpeg_available};
pub use frame::{DisplayInfo, PixelFormat, RawFrame};
pub use pacing::FramePacer;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{RecorderError, Result};

/// Default output file, relative to the working directory.
pub const DEFAULT_OUTPUT_PATH: &str = "race_recording.mp4";
/// Default capture rate.
pub const DEFAULT_FPS: u32 = 30;

/// Recording output settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderConfig {
    pub output_path: PathBuf,
    pub fps: u32,
    pub codec: FourCc,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            fps: DEFAULT_FPS,
            codec: FourCc::MP4V,
        }
    }
}

impl RecorderConfig {
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_codec(mut self, codec: FourCc) -> Self {
        self.codec = codec;
        self
    }
}

/// Summary of a finished recording.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingStats {
    pub output_path: PathBuf,
    pub frames_written: u64,
    pub duration: Duration,
}

struct ActiveRecording {
    cancel: CancellationToken,
    handle: JoinHandle<Result<RecordingStats>>,
}

/// Captures the primary display to a video file on a background thread.
pub struct ScreenRecorder {
    config: RecorderConfig,
    backend: Arc<dyn CaptureBackend>,
    active: Option<ActiveRecording>,
}

impl ScreenRecorder {
    pub fn new(config: RecorderConfig, backend: impl CaptureBackend) -> Self {
        Self::with_shared_backend(config, Arc::new(backend))
    }

    /// Build a recorder around a backend the caller keeps a handle to.
    pub fn with_shared_backend(config: RecorderConfig, backend: Arc<dyn CaptureBackend>) -> Self {
        Self { config, backend, active: None }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Start the capture worker.
    ///
    /// The display is resolved before the worker starts so that a missing
    /// display fails here rather than at [`stop_recording`](Self::stop_recording).
    pub fn start_recording(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Err(RecorderError::AlreadyRecording.into());
        }

        let display = self.backend.primary_display()?;
        let cancel = CancellationToken::new();
        let worker = Worker {
            backend: Arc::clone(&self.backend),
            display,
            config: self.config.clone(),
            cancel: cancel.clone(),
        };

        let handle = thread::Builder::new()
            .name("raceclips-recorder".to_string())
            .spawn(move || worker.run())
            .map_err(|e| RecorderError::Spawn { reason: e.to_string() })?;

        info!(
            path = %self.config.output_path.display(),
            fps = self.config.fps,
            "Started screen recording"
        );
        self.active = Some(ActiveRecording { cancel, handle });
        Ok(())
    }

    /// Stop the worker and wait for the output file to be finalized.
    pub fn stop_recording(&mut self) -> Result<RecordingStats> {
        let active = self.active.take().ok_or(RecorderError::NotRecording)?;
        active.cancel.cancel();

        let stats = active.handle.join().map_err(|panic| RecorderError::WorkerPanicked {
            message: panic_message(panic.as_ref()),
        })??;

        info!(
            path = %stats.output_path.display(),
            frames = stats.frames_written,
            duration_secs = stats.duration.as_secs_f64(),
            "Stopped screen recording"
        );
        Ok(stats)
    }
}

impl Drop for ScreenRecorder {
    fn drop(&mut self) {
        if self.active.is_some() {
            if let Err(e) = self.stop_recording() {
                warn!("Recording did not shut down cleanly: {}", e);
            }
        }
    }
}

struct Worker {
    backend: Arc<dyn CaptureBackend>,
    display: DisplayInfo,
    config: RecorderConfig,
    cancel: CancellationToken,
}

impl Worker {
    fn run(self) -> Result<RecordingStats> {
        let started = Instant::now();
        let mut grabber = self.backend.open_grabber(&self.display)?;
        let settings = VideoSettings {
            path: self.config.output_path.clone(),
            codec: self.config.codec,
            fps: self.config.fps.max(1),
            width: self.display.width,
            height: self.display.height,
        };
        let mut sink = self.backend.open_sink(&settings)?;

        let mut pacer = FramePacer::from_fps(settings.fps);
        let mut frames_written = 0;
        let captured = capture_loop(
            grabber.as_mut(),
            sink.as_mut(),
            &mut pacer,
            &self.cancel,
            &mut frames_written,
        );
        // Finalize even when capture failed, the file is unreadable otherwise
        let finished = sink.finish();

        if let Err(e) = &captured {
            warn!(frames = frames_written, "Capture stopped early: {}", e);
        }
        captured?;
        finished?;

        Ok(RecordingStats {
            output_path: settings.path,
            frames_written,
            duration: started.elapsed(),
        })
    }
}

fn capture_loop(
    grabber: &mut dyn FrameGrabber,
    sink: &mut dyn VideoSink,
    pacer: &mut FramePacer,
    cancel: &CancellationToken,
    frames_written: &mut u64,
) -> Result<()> {
    while pacer.wait(cancel) {
        let frame = grabber.grab()?;
        sink.write_frame(&frame.to_bgr24())?;
        *frames_written += 1;
        if *frames_written % 300 == 0 {
            debug!(frames = *frames_written, "Recording");
        }
    }
    Ok(())
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
