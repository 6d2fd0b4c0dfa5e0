//! Frozen telemetry snapshots with by-name channel lookups.
//!
//! A [`Snapshot`] is the consistent read view produced by
//! [`TelemetrySource::freeze_latest`](crate::source::TelemetrySource::freeze_latest).
//! It owns a copy of one telemetry frame so the monitor can run all of its
//! checks against the same tick, even while the simulator keeps writing.

use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{TrackSurface, VarData, VariableInfo, VariableSchema, VariableType, read_array};
use crate::{ClipsError, Result};

/// Telemetry channel names read by the monitor.
pub mod channels {
    /// Per-car race position (1 = leader, 0 = not classified).
    pub const CAR_IDX_POSITION: &str = "CarIdxPosition";
    /// Per-car lap progress, 0.0 at the start line to 1.0 at completion.
    pub const CAR_IDX_LAP_DIST_PCT: &str = "CarIdxLapDistPct";
    /// Per-car `irsdk_TrkLoc` value.
    pub const CAR_IDX_TRACK_SURFACE: &str = "CarIdxTrackSurface";
    /// Best lap time of the session in seconds.
    pub const SESSION_BEST_LAP_TIME: &str = "SessionBestLapTime";
    /// Seconds since the session started.
    pub const SESSION_TIME: &str = "SessionTime";
}

/// Immutable view over a single telemetry frame.
#[derive(Debug, Clone)]
pub struct Snapshot {
    data: Arc<[u8]>,
    tick: u32,
    schema: Arc<VariableSchema>,
}

impl Snapshot {
    /// Wrap a frozen frame buffer.
    pub fn new(data: Vec<u8>, tick: u32, schema: Arc<VariableSchema>) -> Self {
        Self { data: data.into(), tick, schema }
    }

    /// Simulator tick the frame was published at.
    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn schema(&self) -> &VariableSchema {
        &self.schema
    }

    fn variable(&self, name: &str) -> Result<&VariableInfo> {
        self.schema.get_variable(name).ok_or_else(|| ClipsError::field_not_found(name))
    }

    /// Read a scalar channel (or the first element of an array channel).
    pub fn get<T: VarData>(&self, name: &str) -> Result<T> {
        T::from_bytes(self.data.as_ref(), self.variable(name)?)
    }

    /// Read every element of an array channel, indexed by car slot.
    pub fn get_array<T: VarData>(&self, name: &str) -> Result<Vec<T>> {
        read_array(self.data.as_ref(), self.variable(name)?)
    }

    pub fn car_positions(&self) -> Result<Vec<i32>> {
        self.get_array(channels::CAR_IDX_POSITION)
    }

    pub fn lap_dist_pct(&self) -> Result<Vec<f32>> {
        self.get_array(channels::CAR_IDX_LAP_DIST_PCT)
    }

    pub fn track_surfaces(&self) -> Result<Vec<TrackSurface>> {
        let raw: Vec<i32> = self.get_array(channels::CAR_IDX_TRACK_SURFACE)?;
        Ok(raw.into_iter().map(TrackSurface::from_raw).collect())
    }

    pub fn session_best_lap_time(&self) -> Result<f64> {
        self.get(channels::SESSION_BEST_LAP_TIME)
    }

    pub fn session_time(&self) -> Result<f64> {
        self.get(channels::SESSION_TIME)
    }
}

/// Assembles a schema and frame buffer from named channels.
///
/// Channels are laid out back to back in insertion order. Used by
/// [`ScriptedSource`](crate::sources::ScriptedSource) and by tests.
///
/// ```rust
/// use raceclips::snapshot::{SnapshotBuilder, channels};
///
/// let snapshot = SnapshotBuilder::new()
///     .int_array(channels::CAR_IDX_POSITION, &[3, 1, 2])
///     .double(channels::SESSION_TIME, 42.0)
///     .build(1)
///     .unwrap();
///
/// assert_eq!(snapshot.car_positions().unwrap(), vec![3, 1, 2]);
/// assert_eq!(snapshot.session_time().unwrap(), 42.0);
/// ```
#[derive(Debug, Default, Clone)]
pub struct SnapshotBuilder {
    variables: HashMap<String, VariableInfo>,
    data: Vec<u8>,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, name: &str, data_type: VariableType, count: usize, bytes: &[u8]) -> Self {
        let info = VariableInfo {
            name: name.to_string(),
            data_type,
            offset: self.data.len(),
            count,
            units: String::new(),
            description: String::new(),
        };
        self.data.extend_from_slice(bytes);
        self.variables.insert(name.to_string(), info);
        self
    }

    pub fn int_array(self, name: &str, values: &[i32]) -> Self {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.push(name, VariableType::Int32, values.len(), &bytes)
    }

    pub fn float_array(self, name: &str, values: &[f32]) -> Self {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.push(name, VariableType::Float32, values.len(), &bytes)
    }

    pub fn float(self, name: &str, value: f32) -> Self {
        self.push(name, VariableType::Float32, 1, &value.to_le_bytes())
    }

    pub fn double(self, name: &str, value: f64) -> Self {
        self.push(name, VariableType::Float64, 1, &value.to_le_bytes())
    }

    /// Finish the frame. Fails if any array channel is empty.
    pub fn build(self, tick: u32) -> Result<Snapshot> {
        let frame_size = self.data.len();
        let schema = VariableSchema::new(self.variables, frame_size)?;
        Ok(Snapshot::new(self.data, tick, Arc::new(schema)))
    }
}
