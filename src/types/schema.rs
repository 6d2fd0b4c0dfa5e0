//! Telemetry variable schema types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::VariableType;
use crate::{ClipsError, Result};

/// Schema describing where each telemetry channel lives inside a frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableSchema {
    /// Map of channel names to their metadata (O(1) lookup)
    pub variables: HashMap<String, VariableInfo>,
    /// Total size of a telemetry frame in bytes
    pub frame_size: usize,
}

impl VariableSchema {
    /// Create a new schema, rejecting channels that do not fit in the frame.
    pub fn new(variables: HashMap<String, VariableInfo>, frame_size: usize) -> Result<Self> {
        let schema = Self { variables, frame_size };
        schema.validate()?;
        Ok(schema)
    }

    /// Validate the schema for consistency.
    pub fn validate(&self) -> Result<()> {
        for (name, var_info) in &self.variables {
            if var_info.count == 0 {
                return Err(ClipsError::Parse {
                    context: "Schema validation".to_string(),
                    details: format!("Variable '{}' has count of 0", name),
                });
            }

            if var_info.name != *name {
                return Err(ClipsError::Parse {
                    context: "Schema validation".to_string(),
                    details: format!(
                        "Variable map key '{}' doesn't match info name '{}'",
                        name, var_info.name
                    ),
                });
            }

            if var_info.end_offset() > self.frame_size {
                return Err(ClipsError::Memory { offset: var_info.offset });
            }
        }

        Ok(())
    }

    /// Get variable info by name.
    pub fn get_variable(&self, name: &str) -> Option<&VariableInfo> {
        self.variables.get(name)
    }

    /// Check if a variable exists.
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }
}

/// Information about a single telemetry channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableInfo {
    /// Channel name as published by iRacing (e.g. `CarIdxPosition`)
    pub name: String,
    /// Element type
    pub data_type: VariableType,
    /// Byte offset within the telemetry frame
    pub offset: usize,
    /// Number of elements (1 for scalars, one per car slot for `CarIdx*` arrays)
    pub count: usize,
    /// Units of measurement (e.g. "s", "%")
    pub units: String,
    /// Human-readable description
    pub description: String,
}

impl VariableInfo {
    /// First byte past the end of this channel.
    pub fn end_offset(&self) -> usize {
        self.offset + self.data_type.size() * self.count
    }
}
