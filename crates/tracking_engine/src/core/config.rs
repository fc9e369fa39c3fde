//! # Tracking Configuration
//!
//! All settings of the tracking engine in one serializable structure. The
//! host application loads it through the [`Config`] trait (`.toml` or `.ron`)
//! and hands it to [`TrackingEngine::new`](crate::TrackingEngine::new).
//!
//! ## Configuration Categories
//!
//! - **Tracking**: provider wiring, player count, axis remapping, tick cadence
//! - **Calibration**: where the calibration record lives, marker animation
//! - **Logging**: default log level when `RUST_LOG` is not set

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};
use crate::foundation::math::Size;
use crate::mapping::AxisRemap;

/// Default file name of the persisted calibration record
pub const DEFAULT_CALIBRATION_FILE_NAME: &str = "trackingCalibration.json";

/// # Tracking Settings
///
/// Mirrors the options of the physical rig: how many trackers drive entities,
/// how its axes are wired and which parts of the pose are forwarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSettings {
    /// Whether the provider is started and polled at all
    pub enable_tracking: bool,
    /// Number of tracked entities (players)
    pub number_of_players: usize,
    /// Number of base stations the rig is expected to report
    pub number_of_base_stations: usize,
    /// Forward mapped rotations to consumers
    pub enable_rotation: bool,
    /// Apply the vertical component of mapped positions
    pub enable_y_axis: bool,
    /// Swap the X and Z axes of the raw stream
    pub swap_xz: bool,
    /// Negate the X axis of the raw stream
    pub invert_x: bool,
    /// Negate the Z axis of the raw stream
    pub invert_z: bool,
    /// Interval between tracking ticks in milliseconds
    pub tick_interval_ms: u64,
    /// Extents of the virtual volume the physical base maps onto
    pub virtual_world_space: [f64; 3],
}

impl TrackingSettings {
    /// Axis remap flags of the raw stream
    pub fn axis_remap(&self) -> AxisRemap {
        let mut remap = AxisRemap::empty();
        remap.set(AxisRemap::INVERT_X, self.invert_x);
        remap.set(AxisRemap::INVERT_Z, self.invert_z);
        remap.set(AxisRemap::SWAP_XZ, self.swap_xz);
        remap
    }

    /// Target volume extents
    pub fn virtual_world_space(&self) -> Size {
        Size::from(self.virtual_world_space)
    }

    /// Tick interval as a duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Builder pattern: set player count
    pub fn with_players(mut self, players: usize) -> Self {
        self.number_of_players = players;
        self
    }

    /// Builder pattern: set axis remap flags
    pub fn with_axis_remap(mut self, remap: AxisRemap) -> Self {
        self.invert_x = remap.contains(AxisRemap::INVERT_X);
        self.invert_z = remap.contains(AxisRemap::INVERT_Z);
        self.swap_xz = remap.contains(AxisRemap::SWAP_XZ);
        self
    }

    /// Builder pattern: set target volume
    pub fn with_virtual_world_space(mut self, size: Size) -> Self {
        self.virtual_world_space = [size.x, size.y, size.z];
        self
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.number_of_players == 0 {
            return Err(ConfigError::Invalid("number_of_players must be at least 1".to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be at least 1".to_string()));
        }
        if self.virtual_world_space.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "virtual_world_space must be positive, got {:?}",
                self.virtual_world_space
            )));
        }
        Ok(())
    }
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            enable_tracking: true,
            number_of_players: 1,
            number_of_base_stations: 2,
            enable_rotation: true,
            enable_y_axis: false,
            swap_xz: false,
            invert_x: false,
            invert_z: false,
            tick_interval_ms: 10,
            virtual_world_space: [10.0, 10.0, 10.0],
        }
    }
}

/// # Calibration File Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationFileConfig {
    /// Directory of the calibration record, the platform data directory
    /// when unset
    pub directory: Option<PathBuf>,
    /// File name of the calibration record
    pub file_name: String,
    /// Seconds the sampled markers take to settle onto their calibrated
    /// positions after a successful session
    pub marker_settle_secs: f64,
}

impl CalibrationFileConfig {
    /// Validate the settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.file_name.trim().is_empty() {
            return Err(ConfigError::Invalid("calibration file_name cannot be empty".to_string()));
        }
        if let Some(dir) = &self.directory {
            if dir.is_relative() {
                log::warn!(
                    "Calibration directory {} is relative, it will resolve against the working directory",
                    dir.display()
                );
            }
        }
        if !self.marker_settle_secs.is_finite() || self.marker_settle_secs < 0.0 {
            return Err(ConfigError::Invalid("marker_settle_secs cannot be negative".to_string()));
        }
        Ok(())
    }
}

impl Default for CalibrationFileConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_name: DEFAULT_CALIBRATION_FILE_NAME.to_string(),
            marker_settle_secs: 1.0,
        }
    }
}

/// # Complete Tracking Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Default log level
    pub log_level: String,
    /// Tracking behavior
    pub tracking: TrackingSettings,
    /// Calibration persistence
    pub calibration: CalibrationFileConfig,
}

impl TrackingConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tracking.validate()?;
        self.calibration.validate()?;
        Ok(())
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            tracking: TrackingSettings::default(),
            calibration: CalibrationFileConfig::default(),
        }
    }
}

impl Config for TrackingConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrackingConfig::default().validate().is_ok());
    }

    #[test]
    fn test_axis_remap_from_flags() {
        let settings = TrackingSettings {
            invert_x: true,
            swap_xz: true,
            ..Default::default()
        };
        assert_eq!(settings.axis_remap(), AxisRemap::INVERT_X | AxisRemap::SWAP_XZ);
    }

    #[test]
    fn test_rejects_zero_players() {
        let settings = TrackingSettings::default().with_players(0);
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_non_positive_world_space() {
        let settings = TrackingSettings::default().with_virtual_world_space(Size::new(10.0, 0.0, 10.0));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TrackingConfig = toml::from_str(
            r#"
            log_level = "debug"

            [tracking]
            number_of_players = 3
            swap_xz = true
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.tracking.number_of_players, 3);
        assert!(config.tracking.swap_xz);
        assert_eq!(config.tracking.tick_interval_ms, 10);
        assert_eq!(config.calibration.file_name, DEFAULT_CALIBRATION_FILE_NAME);
    }

    #[test]
    fn test_toml_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.toml");
        let mut config = TrackingConfig::default();
        config.tracking.number_of_players = 4;
        config.calibration.directory = Some(dir.path().to_path_buf());

        config.save_to_file(&path).unwrap();
        let loaded = TrackingConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = TrackingConfig::load_or_default("does-not-exist.yaml");
        assert!(result.is_ok());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.yaml");
        std::fs::write(&path, "log_level: info").unwrap();
        assert!(matches!(
            TrackingConfig::load_from_file(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }
}
