//! Event checks run against each frozen snapshot.
//!
//! Each check is independent and pure apart from the state it owns: the
//! overtake detector keeps the previous position table and the fastest-lap
//! watermark keeps the last seen best lap.

use std::collections::BTreeMap;

use crate::types::{EventKind, TrackSurface};

/// Default close-battle threshold: within 1% of a lap.
pub const CLOSE_BATTLE_THRESHOLD: f64 = 0.01;

/// An event found by a check, before it is timestamped and logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedEvent {
    pub kind: EventKind,
    pub description: String,
}

impl DetectedEvent {
    fn new(kind: EventKind, description: String) -> Self {
        Self { kind, description }
    }
}

/// Detects position gains between consecutive ticks.
///
/// Positions are expected to be unique per tick. When they are not, the
/// overtaken car is the lowest car index that held the position.
#[derive(Debug, Default, Clone)]
pub struct OvertakeDetector {
    last_positions: BTreeMap<usize, i32>,
}

impl OvertakeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previous position table, car index to rank.
    pub fn last_positions(&self) -> &BTreeMap<usize, i32> {
        &self.last_positions
    }

    /// Compare `positions` (indexed by car slot) against the previous tick and
    /// replace the table with them.
    pub fn check(&mut self, positions: &[i32]) -> Vec<DetectedEvent> {
        let current: BTreeMap<usize, i32> = positions.iter().copied().enumerate().collect();
        let mut events = Vec::new();

        for (&car_idx, &position) in &current {
            let Some(&previous) = self.last_positions.get(&car_idx) else {
                continue;
            };
            if position >= previous {
                continue;
            }

            let overtaken = self
                .last_positions
                .iter()
                .find(|&(_, &held)| held == position)
                .map(|(&idx, _)| idx);

            if let Some(overtaken) = overtaken {
                events.push(DetectedEvent::new(
                    EventKind::Overtake,
                    format!("Car {} overtook Car {}", car_idx, overtaken),
                ));
            }
        }

        self.last_positions = current;
        events
    }
}

/// One incident per car currently off the track surface. No debouncing.
pub fn detect_incidents(surfaces: &[TrackSurface]) -> Vec<DetectedEvent> {
    surfaces
        .iter()
        .enumerate()
        .filter(|(_, surface)| surface.is_off_track())
        .map(|(car_idx, _)| {
            DetectedEvent::new(EventKind::Incident, format!("Car {} went off-track", car_idx))
        })
        .collect()
}

/// Close battles between adjacent car slots.
///
/// Compares slot `i` with slot `i + 1`, which is not the running order: two
/// cars next to each other in the arrays need not be racing each other.
/// Gaps are measured in `f64` so the threshold is not rounded to `f32`.
pub fn detect_close_battles(lap_dist_pct: &[f32], threshold: f64) -> Vec<DetectedEvent> {
    lap_dist_pct
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| (f64::from(pair[0]) - f64::from(pair[1])).abs() < threshold)
        .map(|(i, _)| {
            DetectedEvent::new(
                EventKind::CloseBattle,
                format!("Close battle between Car {} and Car {}", i, i + 1),
            )
        })
        .collect()
}

/// Tracks the session-best lap and reports each change.
#[derive(Debug, Default, Clone)]
pub struct FastestLapWatermark {
    best: Option<f64>,
}

impl FastestLapWatermark {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> Option<f64> {
        self.best
    }

    /// Emit an event if `best_lap` differs from the stored watermark.
    pub fn check(&mut self, best_lap: f64) -> Option<DetectedEvent> {
        if self.best == Some(best_lap) {
            return None;
        }
        self.best = Some(best_lap);
        Some(DetectedEvent::new(EventKind::FastestLap, format!("New fastest lap: {:.3}", best_lap)))
    }
}
