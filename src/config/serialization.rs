//! Configuration serialization helpers.
//!
//! Serde already provides JSON serialization. This module centralizes the
//! file and string helpers used by the command line and by hosts, and keeps
//! formatting stable.

use std::path::Path;

use crate::config::SimulationConfig;
use crate::error::{DispatchError, DispatchResult};

/// Serialize a configuration to pretty JSON.
pub fn to_json_pretty(config: &SimulationConfig) -> DispatchResult<String> {
    serde_json::to_string_pretty(config).map_err(|e| DispatchError::Serialization {
        message: format!("serialize configuration: {e}"),
    })
}

/// Deserialize a configuration from JSON.
///
/// Names are not checked against the schema here; that happens when the
/// configuration is resolved.
pub fn from_json(s: &str) -> DispatchResult<SimulationConfig> {
    serde_json::from_str(s).map_err(|e| DispatchError::Serialization {
        message: format!("deserialize configuration: {e}"),
    })
}

/// Read a configuration file.
pub fn load(path: impl AsRef<Path>) -> DispatchResult<SimulationConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| DispatchError::io(path.display().to_string(), &e))?;
    from_json(&text)
}

/// Write a configuration file, replacing any existing one.
pub fn save(path: impl AsRef<Path>, config: &SimulationConfig) -> DispatchResult<()> {
    let path = path.as_ref();
    let text = to_json_pretty(config)?;
    std::fs::write(path, text).map_err(|e| DispatchError::io(path.display().to_string(), &e))
}
