//! Track location decoding for the `CarIdxTrackSurface` channel

use serde::{Deserialize, Serialize};

/// Raw `irsdk_TrkLoc` values.
pub mod trk_loc {
    pub const NOT_IN_WORLD: i32 = -1;
    pub const OFF_TRACK: i32 = 0;
    pub const IN_PIT_STALL: i32 = 1;
    pub const APPROACHING_PITS: i32 = 2;
    pub const ON_TRACK: i32 = 3;
}

/// Where a car was last seen relative to the drivable surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackSurface {
    NotInWorld,
    OffTrack,
    InPitStall,
    ApproachingPits,
    OnTrack,
    Unknown(i32),
}

impl TrackSurface {
    /// Decode a raw `CarIdxTrackSurface` element.
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            trk_loc::NOT_IN_WORLD => TrackSurface::NotInWorld,
            trk_loc::OFF_TRACK => TrackSurface::OffTrack,
            trk_loc::IN_PIT_STALL => TrackSurface::InPitStall,
            trk_loc::APPROACHING_PITS => TrackSurface::ApproachingPits,
            trk_loc::ON_TRACK => TrackSurface::OnTrack,
            other => TrackSurface::Unknown(other),
        }
    }

    /// True for the off-track sentinel.
    pub fn is_off_track(self) -> bool {
        self == TrackSurface::OffTrack
    }
}

impl From<i32> for TrackSurface {
    fn from(raw: i32) -> Self {
        Self::from_raw(raw)
    }
}
