//! Fixed-rate pacing for the capture thread.

use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// Sleeps the calling thread until the next frame is due.
///
/// Deadlines are absolute, so time spent grabbing and encoding is absorbed
/// into the sleep. When a frame overruns its slot the schedule restarts from
/// now instead of bursting to catch up.
#[derive(Debug)]
pub struct FramePacer {
    interval: Duration,
    next_deadline: Instant,
}

impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, next_deadline: Instant::now() + interval }
    }

    /// Pacer for `fps` frames per second. Zero is treated as one.
    pub fn from_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs(1) / fps.max(1))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for the next frame slot. Returns `false` once `cancel` fires.
    pub fn wait(&mut self, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            return false;
        }

        let now = Instant::now();
        if let Some(remaining) = self.next_deadline.checked_duration_since(now) {
            thread::sleep(remaining);
        }

        if cancel.is_cancelled() {
            return false;
        }

        let now = Instant::now();
        self.next_deadline += self.interval;
        if self.next_deadline <= now {
            self.next_deadline = now + self.interval;
        }
        true
    }
}
