//! JSON persistence for walk-forward results.
//!
//! Dates are ISO-8601, money fields are decimal strings and an infinite
//! profit factor is written as `"inf"`, so a saved run loads back equal.

use std::fs;
use std::path::Path;

use thiserror::Error;

use super::results::BacktestResults;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BacktestResults {
    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the JSON report, creating parent directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ExportError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ExportError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
