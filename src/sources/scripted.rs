//! Scripted telemetry source that replays prepared snapshots

use std::collections::VecDeque;
use tracing::{debug, trace};

use crate::snapshot::Snapshot;
use crate::source::TelemetrySource;
use crate::{ClipsError, Result};

/// Replays a fixed queue of snapshots, one per freeze.
///
/// Reports itself connected while frames remain, so a monitor polling it
/// falls back to its reconnect path once the script runs out, the same way it
/// would when the simulator closes.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    frames: VecDeque<Snapshot>,
    running: bool,
    started: bool,
}

impl ScriptedSource {
    /// A source whose simulator is running and will publish `frames` in order.
    pub fn new(frames: impl IntoIterator<Item = Snapshot>) -> Self {
        Self { frames: frames.into_iter().collect(), running: true, started: false }
    }

    /// A source whose simulator is not running; `startup` fails.
    pub fn not_running() -> Self {
        Self::default()
    }

    /// Number of frames not yet frozen.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    /// Whether `startup` has succeeded and `shutdown` has not been called since.
    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl TelemetrySource for ScriptedSource {
    fn startup(&mut self) -> Result<()> {
        if !self.running {
            return Err(ClipsError::connection_failed("scripted simulator is not running"));
        }
        debug!(frames = self.frames.len(), "Scripted source started");
        self.started = true;
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.started {
            debug!(remaining = self.frames.len(), "Scripted source shut down");
        }
        self.started = false;
    }

    fn is_connected(&self) -> bool {
        self.started && !self.frames.is_empty()
    }

    fn freeze_latest(&mut self) -> Result<Snapshot> {
        if !self.started {
            return Err(ClipsError::connection_failed("scripted source was not started"));
        }
        let snapshot = self
            .frames
            .pop_front()
            .ok_or_else(|| ClipsError::connection_failed("scripted source has no more frames"))?;
        trace!(tick = snapshot.tick(), remaining = self.frames.len(), "Froze scripted frame");
        Ok(snapshot)
    }
}
