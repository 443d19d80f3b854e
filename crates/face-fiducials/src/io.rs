//! JSON configuration and report helpers for fiducial localization.

use crate::{FiducialDetectionResult, FiducialError, FiducialParams};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(thiserror::Error, Debug)]
pub enum FiducialIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Configuration of a fiducial localization run.
///
/// Pipeline options sit at the top level next to the paths, so a minimal
/// config is just `{ "mesh_path": "face.obj" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiducialConfig {
    pub mesh_path: String,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(flatten)]
    pub params: FiducialParams,
}

impl FiducialConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, FiducialIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), FiducialIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("fiducials_report.json"))
    }

    /// Validated pipeline parameters.
    pub fn build_params(&self) -> Result<FiducialParams, FiducialError> {
        self.params.validate()?;
        Ok(self.params.clone())
    }
}

/// Everything a run produced, for offline inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiducialReport {
    pub mesh_path: String,
    pub config_path: String,
    pub params: FiducialParams,
    #[serde(default)]
    pub result: Option<FiducialDetectionResult>,
    #[serde(default)]
    pub error: Option<String>,
}

impl FiducialReport {
    /// Build an empty report for `cfg`.
    pub fn new(cfg: &FiducialConfig, config_path: &Path) -> Self {
        Self {
            mesh_path: cfg.mesh_path.clone(),
            config_path: config_path.to_string_lossy().into_owned(),
            params: cfg.params.clone(),
            result: None,
            error: None,
        }
    }

    /// Populate the report from a successful run.
    pub fn set_result(&mut self, res: FiducialDetectionResult) {
        self.result = Some(res);
        self.error = None;
    }

    /// Record a fatal run error.
    pub fn set_error(&mut self, err: FiducialError) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, FiducialIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), FiducialIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
