//! Race event monitor.
//!
//! [`RaceMonitor`] ties a [`TelemetrySource`] to a [`ScreenRecorder`]. While
//! connected it polls the source on a fixed interval, runs the event checks
//! against each frozen snapshot and appends what they find to the
//! [`EventLog`]. While disconnected it waits out the reconnect backoff.
//!
//! ```rust
//! use raceclips::monitor::RaceMonitor;
//! use raceclips::recorder::{RecorderConfig, ScreenRecorder};
//! use raceclips::snapshot::{SnapshotBuilder, channels};
//! use raceclips::sources::ScriptedSource;
//! # use raceclips::recorder::{CaptureBackend, DisplayInfo, FrameGrabber, VideoSettings, VideoSink};
//! # struct NoDisplay;
//! # impl CaptureBackend for NoDisplay {
//! #     fn primary_display(&self) -> raceclips::Result<DisplayInfo> { unimplemented!() }
//! #     fn open_grabber(&self, _: &DisplayInfo) -> raceclips::Result<Box<dyn FrameGrabber>> { unimplemented!() }
//! #     fn open_sink(&self, _: &VideoSettings) -> raceclips::Result<Box<dyn VideoSink>> { unimplemented!() }
//! # }
//!
//! let snapshot = SnapshotBuilder::new()
//!     .int_array(channels::CAR_IDX_POSITION, &[1, 2])
//!     .float_array(channels::CAR_IDX_LAP_DIST_PCT, &[0.25, 0.75])
//!     .int_array(channels::CAR_IDX_TRACK_SURFACE, &[3, 0])
//!     .float(channels::SESSION_BEST_LAP_TIME, 95.5)
//!     .double(channels::SESSION_TIME, 120.0)
//!     .build(1)
//!     .unwrap();
//!
//! let recorder = ScreenRecorder::new(RecorderConfig::default(), NoDisplay);
//! let mut monitor = RaceMonitor::new(ScriptedSource::new([snapshot]), recorder);
//! // Polling works without connect(), as long as the source is started
//! # use raceclips::TelemetrySource;
//! monitor.source_mut().startup().unwrap();
//! let events = monitor.poll_once().unwrap();
//! assert_eq!(events.len(), 2);
//! assert_eq!(events[0].description, "Car 1 went off-track");
//! ```

pub mod detectors;
pub mod event_log;

pub use detectors::{
    CLOSE_BATTLE_THRESHOLD, DetectedEvent, FastestLapWatermark, OvertakeDetector,
    detect_close_battles, detect_incidents,
};
pub use event_log::EventLog;

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::Result;
use crate::recorder::{RecordingStats, ScreenRecorder};
use crate::snapshot::Snapshot;
use crate::source::TelemetrySource;
use crate::types::EventRecord;

/// Default time between polls while connected.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Default wait before rechecking a disconnected source.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

/// Misses between repeated "waiting" log lines.
const WAITING_LOG_EVERY: u64 = 30;

/// Monitor timing and detection settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub reconnect_backoff: Duration,
    pub close_battle_threshold: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect_backoff: DEFAULT_RECONNECT_BACKOFF,
            close_battle_threshold: CLOSE_BATTLE_THRESHOLD,
        }
    }
}

impl MonitorConfig {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    pub fn with_close_battle_threshold(mut self, threshold: f64) -> Self {
        self.close_battle_threshold = threshold;
        self
    }
}

/// Polls telemetry for race events while the screen is being recorded.
pub struct RaceMonitor<S> {
    source: S,
    recorder: ScreenRecorder,
    config: MonitorConfig,
    overtakes: OvertakeDetector,
    fastest_lap: FastestLapWatermark,
    events: EventLog,
}

impl<S: TelemetrySource> RaceMonitor<S> {
    pub fn new(source: S, recorder: ScreenRecorder) -> Self {
        Self::with_config(source, recorder, MonitorConfig::default())
    }

    pub fn with_config(source: S, recorder: ScreenRecorder, config: MonitorConfig) -> Self {
        Self {
            source,
            recorder,
            config,
            overtakes: OvertakeDetector::new(),
            fastest_lap: FastestLapWatermark::new(),
            events: EventLog::new(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn recorder(&self) -> &ScreenRecorder {
        &self.recorder
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Start the telemetry session, then the recording.
    ///
    /// No retry: a simulator that is not running is reported to the caller.
    /// If the recording cannot start the session is shut down again.
    pub fn connect(&mut self) -> Result<()> {
        self.source.startup()?;
        info!("Connected to iRacing");

        if let Err(e) = self.recorder.start_recording() {
            self.source.shutdown();
            return Err(e);
        }
        Ok(())
    }

    /// Shut the telemetry session down and finish the recording.
    ///
    /// Blocks until the recording worker has exited. Returns its statistics if
    /// a recording was running.
    pub fn disconnect(&mut self) -> Result<Option<RecordingStats>> {
        self.source.shutdown();
        info!("Disconnected from iRacing");

        if self.recorder.is_recording() {
            return self.recorder.stop_recording().map(Some);
        }
        Ok(None)
    }

    /// Freeze one snapshot and run every check against it.
    ///
    /// Returns the records appended during this tick.
    pub fn poll_once(&mut self) -> Result<&[EventRecord]> {
        let snapshot = self.source.freeze_latest()?;
        let first = self.events.len();

        let overtakes = self.overtakes.check(&snapshot.car_positions()?);
        self.log_all(&snapshot, overtakes)?;

        let incidents = detect_incidents(&snapshot.track_surfaces()?);
        self.log_all(&snapshot, incidents)?;

        let battles =
            detect_close_battles(&snapshot.lap_dist_pct()?, self.config.close_battle_threshold);
        self.log_all(&snapshot, battles)?;

        let fastest = self.fastest_lap.check(snapshot.session_best_lap_time()?);
        self.log_all(&snapshot, fastest)?;

        trace!(tick = snapshot.tick(), new_events = self.events.len() - first, "Polled telemetry");
        Ok(&self.events.records()[first..])
    }

    fn log_all(
        &mut self,
        snapshot: &Snapshot,
        events: impl IntoIterator<Item = DetectedEvent>,
    ) -> Result<()> {
        for event in events {
            let timestamp = snapshot.session_time()?;
            self.events.record(timestamp, event);
        }
        Ok(())
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// Transient freeze failures are logged and skipped. Malformed telemetry
    /// ends the loop with an error.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        let mut ticker = time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut misses: u64 = 0;

        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Monitoring race events"
        );

        loop {
            if !self.source.is_connected() {
                if misses % WAITING_LOG_EVERY == 0 {
                    if misses == 0 {
                        info!("iRacing is not running, waiting...");
                    } else {
                        debug!(attempts = misses, "Still waiting for iRacing");
                    }
                }
                misses += 1;

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = time::sleep(self.config.reconnect_backoff) => {}
                }
                ticker.reset();
                continue;
            }

            if misses > 0 {
                info!(attempts = misses, "iRacing telemetry is back");
                misses = 0;
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.poll_once() {
                Ok(_) => {}
                Err(e) if e.is_retryable() => warn!("Skipping telemetry tick: {}", e),
                Err(e) => return Err(e),
            }
        }

        info!(events = self.events.len(), "Monitor stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::ScriptedSource;
    use crate::test_utils::{MemoryBackend, quiet_field, race_snapshot};
    use crate::types::EventKind;
    use crate::{ClipsError, RecorderError};
    use crate::recorder::RecorderConfig;
    use crate::snapshot::{SnapshotBuilder, channels};

    fn monitor(frames: Vec<Snapshot>) -> (RaceMonitor<ScriptedSource>, MemoryBackend) {
        let backend = MemoryBackend::new(4, 4);
        let config = RecorderConfig::default().with_fps(200).with_output_path("monitor.mp4");
        let recorder = ScreenRecorder::new(config, backend.clone());
        (RaceMonitor::new(ScriptedSource::new(frames), recorder), backend)
    }

    fn descriptions(records: &[EventRecord]) -> Vec<String> {
        records.iter().map(|r| r.description.clone()).collect()
    }

    #[test]
    fn default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.reconnect_backoff, Duration::from_secs(1));
        assert_eq!(config.close_battle_threshold, 0.01);

        let tuned = config.with_close_battle_threshold(0.05).with_poll_interval(Duration::from_millis(16));
        assert_eq!(tuned.close_battle_threshold, 0.05);
        assert_eq!(tuned.poll_interval, Duration::from_millis(16));
    }

    #[test]
    fn connect_starts_recording_and_disconnect_finishes_it() {
        let (mut monitor, backend) = monitor(vec![quiet_field(1, 0.0, 4).unwrap()]);

        monitor.connect().unwrap();
        assert!(monitor.source().is_started());
        assert!(monitor.recorder().is_recording());

        let stats = monitor.disconnect().unwrap().expect("recording was running");
        assert_eq!(stats.output_path, std::path::PathBuf::from("monitor.mp4"));
        assert!(!monitor.source().is_started());
        assert!(!monitor.recorder().is_recording());
        assert!(backend.is_finished());

        // Second disconnect has nothing to stop
        assert!(monitor.disconnect().unwrap().is_none());
    }

    #[test]
    fn connect_fails_when_simulator_is_not_running() {
        let recorder = ScreenRecorder::new(RecorderConfig::default(), MemoryBackend::new(4, 4));
        let mut monitor = RaceMonitor::new(ScriptedSource::not_running(), recorder);

        let err = monitor.connect().unwrap_err();
        assert!(matches!(err, ClipsError::Connection { .. }));
        assert!(err.is_retryable());
        assert!(!monitor.recorder().is_recording());
    }

    #[test]
    fn recorder_failure_shuts_the_source_down() {
        let (mut monitor, _backend) = monitor(vec![quiet_field(1, 0.0, 4).unwrap()]);
        monitor.connect().unwrap();
        monitor.source_mut().shutdown();

        // A second connect finds the recorder busy
        let err = monitor.connect().unwrap_err();
        assert!(matches!(err, ClipsError::Recorder(RecorderError::AlreadyRecording)));
        assert!(!monitor.source().is_started());
        monitor.disconnect().unwrap();
    }

    #[test]
    fn checks_run_in_fixed_order_with_session_timestamps() {
        let first = race_snapshot(1, 10.0, &[3, 1, 2], &[0.1, 0.4, 0.7], &[3, 3, 3], 95.432).unwrap();
        let second = race_snapshot(2, 10.1, &[1, 2, 3], &[0.50, 0.505, 0.80], &[1, 1, 0], 95.432).unwrap();
        let (mut monitor, _backend) = monitor(vec![first, second]);
        monitor.source_mut().startup().unwrap();

        let tick_one = descriptions(monitor.poll_once().unwrap());
        assert_eq!(tick_one, vec!["New fastest lap: 95.432"]);

        let records = monitor.poll_once().unwrap();
        assert_eq!(
            descriptions(records),
            vec![
                "Car 0 overtook Car 1",
                "Car 2 went off-track",
                "Close battle between Car 0 and Car 1",
            ]
        );
        assert!(records.iter().all(|r| r.timestamp == 10.1));
        assert_eq!(
            records.iter().map(|r| r.kind).collect::<Vec<_>>(),
            vec![EventKind::Overtake, EventKind::Incident, EventKind::CloseBattle]
        );
        assert_eq!(monitor.events().len(), 4);
    }

    #[test]
    fn missing_channel_is_fatal() {
        let broken = SnapshotBuilder::new()
            .int_array(channels::CAR_IDX_POSITION, &[1, 2])
            .double(channels::SESSION_TIME, 1.0)
            .build(1)
            .unwrap();
        let (mut monitor, _backend) = monitor(vec![broken]);
        monitor.source_mut().startup().unwrap();

        let err = monitor.poll_once().unwrap_err();
        assert!(matches!(err, ClipsError::FieldNotFound { ref field } if field == "CarIdxTrackSurface"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn events_without_session_time_fail_but_quiet_ticks_do_not() {
        let quiet = SnapshotBuilder::new()
            .int_array(channels::CAR_IDX_POSITION, &[1, 2])
            .float_array(channels::CAR_IDX_LAP_DIST_PCT, &[0.1, 0.6])
            .int_array(channels::CAR_IDX_TRACK_SURFACE, &[3, 3])
            .float(channels::SESSION_BEST_LAP_TIME, 90.0)
            .build(1)
            .unwrap();
        let (mut monitor, _backend) = monitor(vec![quiet]);
        monitor.source_mut().startup().unwrap();

        // The first best-lap observation needs a timestamp
        let err = monitor.poll_once().unwrap_err();
        assert!(matches!(err, ClipsError::FieldNotFound { ref field } if field == "SessionTime"));
    }

    #[tokio::test(start_paused = true)]
    async fn run_polls_until_cancelled() {
        let frames: Vec<Snapshot> = (0..5).map(|i| quiet_field(i, i as f64 * 0.1, 4).unwrap()).collect();
        let (mut monitor, _backend) = monitor(frames);
        monitor.source_mut().startup().unwrap();

        let shutdown = CancellationToken::new();
        let canceller = shutdown.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(250)).await;
            canceller.cancel();
        });

        monitor.run(shutdown).await.unwrap();

        // Ticks at 0, 100 and 200 ms
        assert_eq!(monitor.source().remaining(), 2);
        assert_eq!(monitor.events().count(EventKind::FastestLap), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_waits_while_disconnected() {
        let (mut monitor, _backend) = monitor(Vec::new());
        monitor.source_mut().startup().unwrap();

        let shutdown = CancellationToken::new();
        let canceller = shutdown.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(3500)).await;
            canceller.cancel();
        });

        monitor.run(shutdown).await.unwrap();
        assert!(monitor.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_propagates_malformed_telemetry() {
        let broken = SnapshotBuilder::new()
            .float_array(channels::CAR_IDX_POSITION, &[1.0, 2.0])
            .build(1)
            .unwrap();
        let (mut monitor, _backend) = monitor(vec![broken]);
        monitor.source_mut().startup().unwrap();

        let err = monitor.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ClipsError::TypeConversion { .. }));
    }
}
