//! Race event detection from live iRacing telemetry, with screen recording.
//!
//! raceclips polls iRacing's shared-memory telemetry, derives race events
//! (overtakes, off-track incidents, close battles and fastest laps) and logs
//! them with their session timestamp while the desktop is recorded to a video
//! file in the background.
//!
//! # Architecture
//!
//! - [`TelemetrySource`] freezes consistent [`Snapshot`]s. [`sources::LiveSource`]
//!   reads iRacing on Windows and [`sources::ScriptedSource`] replays prepared
//!   frames anywhere.
//! - [`RaceMonitor`] polls the source, runs the [`monitor::detectors`] and keeps
//!   the [`monitor::EventLog`].
//! - [`ScreenRecorder`] owns a capture thread that feeds a
//!   [`recorder::VideoSink`] at a fixed frame rate.
//!
//! # Example
//!
//! ```rust,no_run
//! use raceclips::recorder::{DesktopBackend, RecorderConfig};
//! use raceclips::sources::LiveSource;
//! use raceclips::{RaceMonitor, ScreenRecorder};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> raceclips::Result<()> {
//! let recorder = ScreenRecorder::new(RecorderConfig::default(), DesktopBackend::new());
//! let mut monitor = RaceMonitor::new(LiveSource::new(), recorder);
//!
//! monitor.connect()?;
//! let result = monitor.run(CancellationToken::new()).await;
//! monitor.disconnect()?;
//! result
//! # }
//! ```

mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

pub mod monitor;
pub mod recorder;
pub mod snapshot;
pub mod source;
pub mod sources;

// Platform-specific modules
#[cfg(windows)]
pub mod windows;

pub use error::{ClipsError, RecorderError, Result};
pub use types::{EventKind, EventRecord, TrackSurface};

pub use monitor::{EventLog, MonitorConfig, RaceMonitor};
pub use recorder::{RecorderConfig, RecordingStats, ScreenRecorder};
pub use snapshot::{Snapshot, SnapshotBuilder};
pub use source::TelemetrySource;
