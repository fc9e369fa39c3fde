//! Persistence of the calibration record
//!
//! The record is a small JSON document:
//!
//! ```json
//! {
//!   "center": { "x": 0.0, "y": 0.0, "z": 0.0 },
//!   "realWorldSize": { "x": 1.0, "y": 1.0, "z": 1.0 },
//!   "rotationOffset": { "x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0 }
//! }
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::{CalibrationFileConfig, DEFAULT_CALIBRATION_FILE_NAME};
use crate::foundation::math::{Point3, Quat, Quaternion, Size, EPSILON};

use super::model::{Calibration, SharedCalibration};

/// Persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record at the given path
    #[error("Calibration file not found: {0}")]
    NotFound(PathBuf),

    /// IO error
    #[error("IO error on {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Malformed record
    #[error("Malformed calibration file {path}: {reason}")]
    Parse {
        /// File involved
        path: PathBuf,
        /// What was wrong
        reason: String,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Saving an invalid calibration
    #[error("Calibration not completed, nothing to save")]
    NotCalibrated,
}

/// Result of [`CalibrationStore::remove`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The record was deleted
    Removed,
    /// There was no record
    NothingToRemove,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct Vec3Record {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct QuatRecord {
    x: f64,
    y: f64,
    z: f64,
    w: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalibrationRecord {
    center: Vec3Record,
    real_world_size: Vec3Record,
    rotation_offset: QuatRecord,
}

impl From<&Calibration> for CalibrationRecord {
    fn from(calibration: &Calibration) -> Self {
        let center = calibration.center();
        let size = calibration.real_world_size();
        let rotation = calibration.rotation_offset();
        Self {
            center: Vec3Record { x: center.x, y: center.y, z: center.z },
            real_world_size: Vec3Record { x: size.x, y: size.y, z: size.z },
            rotation_offset: QuatRecord {
                x: rotation.i,
                y: rotation.j,
                z: rotation.k,
                w: rotation.w,
            },
        }
    }
}

impl CalibrationRecord {
    fn into_calibration(self) -> Result<Calibration, String> {
        let r = self.rotation_offset;
        let raw = Quaternion::new(r.w, r.x, r.y, r.z);
        let norm = raw.norm();
        if !norm.is_finite() || norm <= EPSILON {
            return Err(format!("rotationOffset is not a rotation: {r:?}"));
        }

        let c = self.center;
        let s = self.real_world_size;
        let values = [c.x, c.y, c.z, s.x, s.y, s.z];
        if values.iter().any(|v| !v.is_finite()) {
            return Err("non-finite center or realWorldSize".to_string());
        }

        Ok(Calibration::new(
            Point3::new(c.x, c.y, c.z),
            Quat::from_quaternion(raw),
            Size::new(s.x, s.y, s.z),
        ))
    }
}

/// Reads, writes and removes the persisted calibration record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationStore {
    path: PathBuf,
}

impl CalibrationStore {
    /// Store at an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the configured directory, or the platform data directory
    pub fn from_config(config: &CalibrationFileConfig) -> Self {
        let directory = config.directory.clone().unwrap_or_else(default_directory);
        Self::new(directory.join(&config.file_name))
    }

    /// Default record location
    pub fn default_path() -> PathBuf {
        default_directory().join(DEFAULT_CALIBRATION_FILE_NAME)
    }

    /// Path of the record
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a record exists
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the calibration
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if there is no record, [`StoreError::Parse`]
    /// if it is malformed. Callers keep running uncalibrated in both cases.
    pub fn load(&self) -> Result<Calibration, StoreError> {
        log::info!("Fetching calibration at {}", self.path.display());

        let contents = std::fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StoreError::NotFound(self.path.clone())
            } else {
                StoreError::Io { path: self.path.clone(), source }
            }
        })?;

        let record: CalibrationRecord = serde_json::from_str(&contents).map_err(|e| StoreError::Parse {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        record.into_calibration().map_err(|reason| StoreError::Parse {
            path: self.path.clone(),
            reason,
        })
    }

    /// Save the calibration
    ///
    /// # Errors
    /// [`StoreError::NotCalibrated`] for an invalid calibration; nothing is
    /// written in that case.
    pub fn save(&self, calibration: &Calibration) -> Result<(), StoreError> {
        if !calibration.is_valid() {
            return Err(StoreError::NotCalibrated);
        }

        let contents = serde_json::to_string_pretty(&CalibrationRecord::from(calibration))
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        std::fs::write(&self.path, contents).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;

        log::info!("Calibration saved to {}", self.path.display());
        Ok(())
    }

    /// Delete the record and reset the active calibration
    ///
    /// Removing a missing record is not an error.
    ///
    /// # Errors
    /// [`StoreError::Io`] if an existing record cannot be deleted. The active
    /// calibration is reset either way.
    pub fn remove(&self, active: &SharedCalibration) -> Result<RemoveOutcome, StoreError> {
        active.clear();

        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                log::info!("Calibration removed from {}", self.path.display());
                Ok(RemoveOutcome::Removed)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::info!("No calibration file found to remove at {}", self.path.display());
                Ok(RemoveOutcome::NothingToRemove)
            }
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

fn default_directory() -> PathBuf {
    directories::ProjectDirs::from("", "", "tracking_engine").map_or_else(
        || {
            log::warn!("No platform data directory, storing calibration in the working directory");
            PathBuf::from(".")
        },
        |dirs| dirs.data_dir().to_path_buf(),
    )
}
