//! Race event records

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of race event derived from telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Overtake,
    Incident,
    CloseBattle,
    FastestLap,
}

impl EventKind {
    /// Human-readable label used in console output.
    pub const fn label(self) -> &'static str {
        match self {
            EventKind::Overtake => "Overtake",
            EventKind::Incident => "Incident",
            EventKind::CloseBattle => "Close Battle",
            EventKind::FastestLap => "Fastest Lap",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single timestamped event. Never mutated once logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Session time in seconds when the event was observed
    pub timestamp: f64,
    pub kind: EventKind,
    pub description: String,
}

impl EventRecord {
    pub fn new(timestamp: f64, kind: EventKind, description: impl Into<String>) -> Self {
        Self { timestamp, kind, description: description.into() }
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Event logged: {} at {:.2}s - {}",
            self.kind, self.timestamp, self.description
        )
    }
}
