//! Drives a full monitor session: connect, poll a scripted race, disconnect.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use raceclips::recorder::{
    CaptureBackend, DisplayInfo, FrameGrabber, PixelFormat, RawFrame, RecorderConfig,
    VideoSettings, VideoSink,
};
use raceclips::snapshot::{SnapshotBuilder, channels};
use raceclips::sources::ScriptedSource;
use raceclips::{EventKind, MonitorConfig, RaceMonitor, ScreenRecorder, Snapshot};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Recording {
    frames: usize,
    finished: bool,
    settings: Option<VideoSettings>,
}

#[derive(Clone, Default)]
struct InMemoryDesktop {
    recording: Arc<Mutex<Recording>>,
}

struct SolidGrabber {
    width: u32,
    height: u32,
}

impl FrameGrabber for SolidGrabber {
    fn grab(&mut self) -> raceclips::Result<RawFrame> {
        let pixels = (self.width * self.height) as usize;
        RawFrame::new(self.width, self.height, PixelFormat::Rgba, [200, 100, 50, 255].repeat(pixels))
    }
}

struct CountingSink {
    recording: Arc<Mutex<Recording>>,
    expected_len: usize,
}

impl VideoSink for CountingSink {
    fn write_frame(&mut self, bgr: &[u8]) -> raceclips::Result<()> {
        assert_eq!(bgr.len(), self.expected_len);
        assert_eq!(&bgr[..3], &[50, 100, 200]);
        self.recording.lock().unwrap().frames += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> raceclips::Result<()> {
        self.recording.lock().unwrap().finished = true;
        Ok(())
    }
}

impl CaptureBackend for InMemoryDesktop {
    fn primary_display(&self) -> raceclips::Result<DisplayInfo> {
        Ok(DisplayInfo { width: 16, height: 9 })
    }

    fn open_grabber(&self, display: &DisplayInfo) -> raceclips::Result<Box<dyn FrameGrabber>> {
        Ok(Box::new(SolidGrabber { width: display.width, height: display.height }))
    }

    fn open_sink(&self, settings: &VideoSettings) -> raceclips::Result<Box<dyn VideoSink>> {
        self.recording.lock().unwrap().settings = Some(settings.clone());
        Ok(Box::new(CountingSink {
            recording: Arc::clone(&self.recording),
            expected_len: settings.frame_len(),
        }))
    }
}

fn tick(tick: u32, positions: &[i32], dist: &[f32], surfaces: &[i32], best_lap: f32) -> Snapshot {
    SnapshotBuilder::new()
        .int_array(channels::CAR_IDX_POSITION, positions)
        .float_array(channels::CAR_IDX_LAP_DIST_PCT, dist)
        .int_array(channels::CAR_IDX_TRACK_SURFACE, surfaces)
        .float(channels::SESSION_BEST_LAP_TIME, best_lap)
        .double(channels::SESSION_TIME, 600.0 + f64::from(tick) * 0.1)
        .build(tick)
        .unwrap()
}

fn scripted_race() -> Vec<Snapshot> {
    vec![
        tick(1, &[1, 2, 3, 4], &[0.40, 0.30, 0.20, 0.10], &[3, 3, 3, 3], 92.5),
        // Car 1 passes car 0 and closes on it
        tick(2, &[2, 1, 3, 4], &[0.410, 0.415, 0.21, 0.11], &[3, 3, 3, 3], 92.5),
        // Car 3 spins off, a new best lap is set
        tick(3, &[2, 1, 3, 4], &[0.42, 0.45, 0.22, 0.11], &[3, 3, 3, 0], 91.75),
        tick(4, &[2, 1, 3, 4], &[0.43, 0.46, 0.23, 0.12], &[3, 3, 3, 3], 91.75),
    ]
}

#[tokio::test(start_paused = true)]
async fn full_session_logs_events_and_finishes_recording() {
    let desktop = InMemoryDesktop::default();
    let recorder_config = RecorderConfig::default().with_fps(120).with_output_path("e2e.mp4");
    let recorder = ScreenRecorder::new(recorder_config, desktop.clone());
    let config = MonitorConfig::default().with_reconnect_backoff(Duration::from_millis(500));
    let mut monitor = RaceMonitor::with_config(ScriptedSource::new(scripted_race()), recorder, config);

    monitor.connect().unwrap();
    assert!(monitor.recorder().is_recording());

    let shutdown = CancellationToken::new();
    let canceller = shutdown.clone();
    tokio::spawn(async move {
        // Four polls, then a stretch on the reconnect path
        tokio::time::sleep(Duration::from_secs(2)).await;
        canceller.cancel();
    });
    monitor.run(shutdown).await.unwrap();

    // Let the capture thread produce a few frames on the real clock
    std::thread::sleep(Duration::from_millis(50));
    let stats = monitor.disconnect().unwrap().expect("recording was running");

    let log: Vec<(EventKind, String)> = monitor
        .events()
        .records()
        .iter()
        .map(|r| (r.kind, r.description.clone()))
        .collect();
    assert_eq!(
        log,
        vec![
            (EventKind::FastestLap, "New fastest lap: 92.500".to_string()),
            (EventKind::Overtake, "Car 1 overtook Car 0".to_string()),
            (EventKind::CloseBattle, "Close battle between Car 0 and Car 1".to_string()),
            (EventKind::Incident, "Car 3 went off-track".to_string()),
            (EventKind::FastestLap, "New fastest lap: 91.750".to_string()),
        ]
    );
    assert!((monitor.events().records()[1].timestamp - 600.2).abs() < 1e-9);

    let recording = desktop.recording.lock().unwrap();
    assert!(recording.finished);
    assert_eq!(recording.frames as u64, stats.frames_written);
    assert!(stats.frames_written > 0);

    let settings = recording.settings.as_ref().unwrap();
    assert_eq!(settings.path, std::path::PathBuf::from("e2e.mp4"));
    assert_eq!(settings.codec.to_string(), "mp4v");
    assert_eq!((settings.width, settings.height, settings.fps), (16, 9, 120));
}

#[test]
fn connect_reports_a_simulator_that_is_not_running() {
    let desktop = InMemoryDesktop::default();
    let recorder = ScreenRecorder::new(RecorderConfig::default(), desktop.clone());
    let mut monitor = RaceMonitor::new(ScriptedSource::not_running(), recorder);

    let err = monitor.connect().unwrap_err();
    assert!(err.is_retryable());
    assert!(!monitor.recorder().is_recording());
    assert!(desktop.recording.lock().unwrap().settings.is_none());
}
