//! Replay configuration.

use crate::error::ReplayError;
use roadview_core::ManagerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for loading a recording directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Directory holding one file per frame
    pub data_dir: PathBuf,

    /// Frame file extension (default: "json")
    pub extension: String,

    /// chrono format of the whole-second part of a frame file stem
    /// (default: "%Y-%m-%d %H-%M-%S")
    pub timestamp_format: String,

    /// Separator before the microsecond suffix of the stem (default: '-').
    /// `None` if stems carry no fractional part.
    pub fraction_separator: Option<char>,

    /// Store window
    pub manager: ManagerConfig,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            extension: "json".to_string(),
            timestamp_format: "%Y-%m-%d %H-%M-%S".to_string(),
            fraction_separator: Some('-'),
            manager: ManagerConfig::default(),
        }
    }
}

impl ReplayConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Loads a JSON config file; missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ReplayError> {
        let text = std::fs::read_to_string(path).map_err(|e| ReplayError::io(path, e))?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ReplayError::json(path, e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReplayError> {
        if self.extension.is_empty() {
            return Err(ReplayError::Config("extension must not be empty".to_string()));
        }
        if self.timestamp_format.is_empty() {
            return Err(ReplayError::Config("timestamp_format must not be empty".to_string()));
        }
        Ok(())
    }
}
