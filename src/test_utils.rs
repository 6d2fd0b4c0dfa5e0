//! Test utilities: in-memory capture backend and race snapshot fixtures.
//!
//! Shared by the unit tests and the `event_detection` benchmark.

#![cfg(any(test, feature = "benchmark"))]

use std::sync::{Arc, Mutex, MutexGuard};

use crate::recorder::{
    CaptureBackend, DisplayInfo, FrameGrabber, PixelFormat, RawFrame, VideoSettings, VideoSink,
};
use crate::snapshot::{Snapshot, SnapshotBuilder, channels};
use crate::{ClipsError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    frames_written: usize,
    frame_len: Option<usize>,
    finished: bool,
    sinks_opened: usize,
    grabs: usize,
}

/// Capture backend that produces solid frames and counts what reaches the sink.
///
/// Clones share state, so a test can keep one handle while the recorder owns
/// another.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    width: u32,
    height: u32,
    fail_after: Option<usize>,
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, fail_after: None, state: Arc::default() }
    }

    /// Make every grab after the first `grabs` fail with a capture error.
    pub fn failing_after(mut self, grabs: usize) -> Self {
        self.fail_after = Some(grabs);
        self
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn frames_written(&self) -> usize {
        self.state().frames_written
    }

    /// Length of the last frame the sink received.
    pub fn frame_len(&self) -> Option<usize> {
        self.state().frame_len
    }

    /// Whether the most recent sink was finalized.
    pub fn is_finished(&self) -> bool {
        self.state().finished
    }

    pub fn sinks_opened(&self) -> usize {
        self.state().sinks_opened
    }
}

impl CaptureBackend for MemoryBackend {
    fn primary_display(&self) -> Result<DisplayInfo> {
        Ok(DisplayInfo { width: self.width, height: self.height })
    }

    fn open_grabber(&self, display: &DisplayInfo) -> Result<Box<dyn FrameGrabber>> {
        Ok(Box::new(MemoryGrabber {
            backend: self.clone(),
            width: display.width,
            height: display.height,
        }))
    }

    fn open_sink(&self, _settings: &VideoSettings) -> Result<Box<dyn VideoSink>> {
        let mut state = self.state();
        state.sinks_opened += 1;
        state.finished = false;
        Ok(Box::new(MemorySink { backend: self.clone() }))
    }
}

struct MemoryGrabber {
    backend: MemoryBackend,
    width: u32,
    height: u32,
}

impl FrameGrabber for MemoryGrabber {
    fn grab(&mut self) -> Result<RawFrame> {
        let grabs = {
            let mut state = self.backend.state();
            state.grabs += 1;
            state.grabs
        };
        if self.backend.fail_after.is_some_and(|limit| grabs > limit) {
            return Err(ClipsError::capture_failed("memory display went away"));
        }
        let pixels = self.width as usize * self.height as usize;
        RawFrame::new(self.width, self.height, PixelFormat::Bgra, [16, 32, 64, 255].repeat(pixels))
    }
}

struct MemorySink {
    backend: MemoryBackend,
}

impl VideoSink for MemorySink {
    fn write_frame(&mut self, bgr: &[u8]) -> Result<()> {
        let mut state = self.backend.state();
        state.frames_written += 1;
        state.frame_len = Some(bgr.len());
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        self.backend.state().finished = true;
        Ok(())
    }
}

/// Snapshot with every channel the monitor reads.
pub fn race_snapshot(
    tick: u32,
    session_time: f64,
    positions: &[i32],
    lap_dist_pct: &[f32],
    track_surfaces: &[i32],
    best_lap: f32,
) -> Result<Snapshot> {
    SnapshotBuilder::new()
        .int_array(channels::CAR_IDX_POSITION, positions)
        .float_array(channels::CAR_IDX_LAP_DIST_PCT, lap_dist_pct)
        .int_array(channels::CAR_IDX_TRACK_SURFACE, track_surfaces)
        .float(channels::SESSION_BEST_LAP_TIME, best_lap)
        .double(channels::SESSION_TIME, session_time)
        .build(tick)
}

/// A quiet `cars`-car field: distinct positions, evenly spread, all on track.
pub fn quiet_field(tick: u32, session_time: f64, cars: usize) -> Result<Snapshot> {
    let positions: Vec<i32> = (1..=cars as i32).collect();
    let spread: Vec<f32> = (0..cars).map(|i| i as f32 / cars as f32).collect();
    let surfaces = vec![crate::types::trk_loc::ON_TRACK; cars];
    race_snapshot(tick, session_time, &positions, &spread, &surfaces, 90.0)
}
