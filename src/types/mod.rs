//! Core types for telemetry and race events.
//!
//! ## Architecture
//!
//! The telemetry types map directly to iRacing SDK structures:
//! - [`VariableSchema`] describes where each channel lives in a frame, with O(1) lookup
//! - [`VariableType`] maps to `irsdk_VarType` with size information
//! - [`VarData`] reads typed values out of a frozen frame buffer
//! - [`TrackSurface`] decodes `irsdk_TrkLoc` values
//!
//! The event types are what the monitor produces:
//! - [`EventKind`] and [`EventRecord`]
//!
//! ## Usage Example
//!
//! ```rust
//! use raceclips::types::{VariableInfo, VariableSchema, VariableType, read_array};
//! use std::collections::HashMap;
//!
//! let mut variables = HashMap::new();
//! variables.insert("CarIdxPosition".to_string(), VariableInfo {
//!     name: "CarIdxPosition".to_string(),
//!     data_type: VariableType::Int32,
//!     offset: 0,
//!     count: 2,
//!     units: String::new(),
//!     description: "Cars position in race by car index".to_string(),
//! });
//!
//! let schema = VariableSchema::new(variables, 8).unwrap();
//! let mut data = Vec::new();
//! data.extend_from_slice(&2i32.to_le_bytes());
//! data.extend_from_slice(&1i32.to_le_bytes());
//!
//! let info = schema.get_variable("CarIdxPosition").unwrap();
//! let positions: Vec<i32> = read_array(&data, info).unwrap();
//! assert_eq!(positions, vec![2, 1]);
//! ```

mod event;
mod schema;
mod track_surface;
mod var_data;
mod variable_type;

pub use event::{EventKind, EventRecord};
pub use schema::{VariableInfo, VariableSchema};
pub use track_surface::{TrackSurface, trk_loc};
pub use var_data::{VarData, read_array};
pub use variable_type::VariableType;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClipsError;
    use proptest::prelude::*;
    use std::collections::HashMap;

    const ALL_TYPES: [VariableType; 6] = [
        VariableType::Char,
        VariableType::Bool,
        VariableType::Int32,
        VariableType::BitField,
        VariableType::Float32,
        VariableType::Float64,
    ];

    fn info(name: &str, data_type: VariableType, offset: usize, count: usize) -> VariableInfo {
        VariableInfo {
            name: name.to_string(),
            data_type,
            offset,
            count,
            units: String::new(),
            description: String::new(),
        }
    }

    proptest! {
        #[test]
        fn prop_schema_accepts_channels_inside_the_frame(
            data_type in prop::sample::select(ALL_TYPES.to_vec()),
            offset in 0..512usize,
            count in 1..64usize,
        ) {
            let var = info("Channel", data_type, offset, count);
            let frame_size = var.end_offset();
            let mut variables = HashMap::new();
            variables.insert("Channel".to_string(), var.clone());

            prop_assert!(VariableSchema::new(variables.clone(), frame_size).is_ok());
            let too_small = VariableSchema::new(variables, frame_size - 1);
            prop_assert!(matches!(too_small, Err(ClipsError::Memory { .. })), "expected ClipsError::Memory");
        }

        #[test]
        fn prop_irsdk_type_codes_round_trip_sizes(raw in -4i32..12) {
            match VariableType::from_irsdk(raw) {
                Some(ty) => {
                    prop_assert!((0..=5).contains(&raw));
                    prop_assert!(matches!(ty.size(), 1 | 4 | 8));
                }
                None => prop_assert!(!(0..=5).contains(&raw)),
            }
        }

        #[test]
        fn prop_int_arrays_read_back_in_slot_order(
            values in prop::collection::vec(any::<i32>(), 1..64),
            offset in 0..32usize,
        ) {
            let mut data = vec![0u8; offset];
            for v in &values {
                data.extend_from_slice(&v.to_le_bytes());
            }
            let var = info("CarIdxPosition", VariableType::Int32, offset, values.len());
            let read: Vec<i32> = read_array(&data, &var).unwrap();
            prop_assert_eq!(read, values);
        }
    }

    #[test]
    fn variable_type_sizes() {
        assert_eq!(VariableType::Char.size(), 1);
        assert_eq!(VariableType::Bool.size(), 1);
        assert_eq!(VariableType::Int32.size(), 4);
        assert_eq!(VariableType::BitField.size(), 4);
        assert_eq!(VariableType::Float32.size(), 4);
        assert_eq!(VariableType::Float64.size(), 8);
    }

    #[test]
    fn float32_channels_widen_to_f64() {
        let data = 95.432f32.to_le_bytes();
        let var = info("SessionBestLapTime", VariableType::Float32, 0, 1);
        let value = f64::from_bytes(&data, &var).unwrap();
        assert_eq!(value, 95.432f32 as f64);
    }

    #[test]
    fn mismatched_type_is_a_conversion_error() {
        let data = 1.5f32.to_le_bytes();
        let var = info("CarIdxLapDistPct", VariableType::Float32, 0, 1);
        assert!(matches!(i32::from_bytes(&data, &var), Err(ClipsError::TypeConversion { .. })));
    }

    #[test]
    fn short_buffer_is_a_memory_error() {
        let data = [0u8; 6];
        let var = info("CarIdxPosition", VariableType::Int32, 0, 2);
        let result: crate::Result<Vec<i32>> = read_array(&data, &var);
        assert!(matches!(result, Err(ClipsError::Memory { offset: 4 })));
    }

    #[test]
    fn track_surface_decoding() {
        assert_eq!(TrackSurface::from_raw(-1), TrackSurface::NotInWorld);
        assert_eq!(TrackSurface::from_raw(0), TrackSurface::OffTrack);
        assert_eq!(TrackSurface::from_raw(3), TrackSurface::OnTrack);
        assert_eq!(TrackSurface::from_raw(9), TrackSurface::Unknown(9));
        assert!(TrackSurface::from(trk_loc::OFF_TRACK).is_off_track());
        assert!(!TrackSurface::from(trk_loc::IN_PIT_STALL).is_off_track());
    }

    #[test]
    fn event_record_console_line() {
        let record = EventRecord::new(12.346, EventKind::CloseBattle, "Close battle between Car 0 and Car 1");
        assert_eq!(
            record.to_string(),
            "Event logged: Close Battle at 12.35s - Close battle between Car 0 and Car 1"
        );
    }
}
