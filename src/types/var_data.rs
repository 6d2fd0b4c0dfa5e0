//! Typed reads of telemetry values out of a frozen frame buffer

use super::{VariableInfo, VariableType};
use crate::{ClipsError, Result};

/// Types that can be read from binary telemetry data.
///
/// `read_at` decodes one element; `from_bytes` reads the first element of a
/// channel. Whole per-car arrays go through [`read_array`].
pub trait VarData: Sized {
    /// Decode one element of `data_type` starting at `offset`.
    fn read_at(data: &[u8], data_type: VariableType, offset: usize) -> Result<Self>;

    /// Parse the (first element of the) channel described by `info`.
    fn from_bytes(data: &[u8], info: &VariableInfo) -> Result<Self> {
        Self::read_at(data, info.data_type, info.offset)
    }
}

/// Read every element of an array channel such as `CarIdxPosition`.
pub fn read_array<T: VarData>(data: &[u8], info: &VariableInfo) -> Result<Vec<T>> {
    let element_size = info.data_type.size();
    (0..info.count)
        .map(|i| T::read_at(data, info.data_type, info.offset + i * element_size))
        .collect()
}

fn bytes<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
    data.get(offset..offset + N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(ClipsError::Memory { offset })
}

fn type_mismatch(expected: &str, found: VariableType) -> ClipsError {
    ClipsError::TypeConversion { details: format!("Expected {}, got {:?}", expected, found) }
}

impl VarData for i32 {
    fn read_at(data: &[u8], data_type: VariableType, offset: usize) -> Result<Self> {
        match data_type {
            VariableType::Int32 | VariableType::BitField => {
                Ok(i32::from_le_bytes(bytes::<4>(data, offset)?))
            }
            other => Err(type_mismatch("Int32", other)),
        }
    }
}

impl VarData for f32 {
    fn read_at(data: &[u8], data_type: VariableType, offset: usize) -> Result<Self> {
        match data_type {
            VariableType::Float32 => Ok(f32::from_le_bytes(bytes::<4>(data, offset)?)),
            other => Err(type_mismatch("Float32", other)),
        }
    }
}

// Widens Float32 channels so session clocks and lap times read uniformly.
impl VarData for f64 {
    fn read_at(data: &[u8], data_type: VariableType, offset: usize) -> Result<Self> {
        match data_type {
            VariableType::Float64 => Ok(f64::from_le_bytes(bytes::<8>(data, offset)?)),
            VariableType::Float32 => Ok(f32::from_le_bytes(bytes::<4>(data, offset)?) as f64),
            other => Err(type_mismatch("Float64 or Float32", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(data_type: VariableType, offset: usize, count: usize) -> VariableInfo {
        VariableInfo {
            name: "Test".to_string(),
            data_type,
            offset,
            count,
            units: String::new(),
            description: String::new(),
        }
    }

    #[test]
    fn per_car_array_reads_every_slot() {
        let data: Vec<u8> = [3i32, 1, 2].iter().flat_map(|v| v.to_le_bytes()).collect();
        let positions: Vec<i32> = read_array(&data, &info(VariableType::Int32, 0, 3)).unwrap();
        assert_eq!(positions, vec![3, 1, 2]);
    }

    #[test]
    fn float32_widens_to_f64() {
        let data = 95.5f32.to_le_bytes();
        let lap = f64::from_bytes(&data, &info(VariableType::Float32, 0, 1)).unwrap();
        assert_eq!(lap, 95.5);
    }

    #[test]
    fn bool_and_char_channels_are_not_read_as_numbers() {
        let data = [1u8; 8];
        let err = i32::from_bytes(&data, &info(VariableType::Bool, 0, 1)).unwrap_err();
        assert!(matches!(err, ClipsError::TypeConversion { .. }));
        assert!(f64::from_bytes(&data, &info(VariableType::Char, 0, 1)).is_err());
    }

    #[test]
    fn read_past_frame_end_is_a_memory_error() {
        let data = [0u8; 6];
        let err = f32::from_bytes(&data, &info(VariableType::Float32, 4, 1)).unwrap_err();
        assert!(matches!(err, ClipsError::Memory { offset: 4 }));
    }
}
