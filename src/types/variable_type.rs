//! Telemetry variable type definitions

use serde::{Deserialize, Serialize};

/// Telemetry data types published by the iRacing SDK.
/// Maps to the SDK's `irsdk_VarType` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableType {
    /// 8-bit character (irsdk_char)
    Char,
    /// Boolean value stored in one byte (irsdk_bool)
    Bool,
    /// 32-bit signed integer (irsdk_int)
    Int32,
    /// 32-bit bitfield (irsdk_bitField)
    BitField,
    /// 32-bit floating point (irsdk_float)
    Float32,
    /// 64-bit floating point (irsdk_double)
    Float64,
}

impl VariableType {
    /// Returns the size in bytes of one element of this type.
    /// Matches the irsdk_VarTypeBytes array from the iRacing SDK.
    pub const fn size(&self) -> usize {
        match self {
            VariableType::Char | VariableType::Bool => 1,
            VariableType::Int32 | VariableType::BitField | VariableType::Float32 => 4,
            VariableType::Float64 => 8,
        }
    }

    /// Decode the raw `irsdk_VarType` discriminant.
    pub const fn from_irsdk(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(VariableType::Char),
            1 => Some(VariableType::Bool),
            2 => Some(VariableType::Int32),
            3 => Some(VariableType::BitField),
            4 => Some(VariableType::Float32),
            5 => Some(VariableType::Float64),
            _ => None,
        }
    }
}
