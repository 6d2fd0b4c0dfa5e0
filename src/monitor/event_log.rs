//! Append-only log of detected race events.

use tracing::info;

use super::detectors::DetectedEvent;
use crate::types::{EventKind, EventRecord};

/// Session-long event history. Every appended record is also written to the
/// `raceclips::events` tracing target.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp `event` with `timestamp` (session seconds) and append it.
    pub fn record(&mut self, timestamp: f64, event: DetectedEvent) -> &EventRecord {
        let record = EventRecord::new(timestamp, event.kind, event.description);
        info!(target: "raceclips::events", kind = %record.kind, "{}", record);
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of logged events of `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.records.iter().filter(|r| r.kind == kind).count()
    }
}
