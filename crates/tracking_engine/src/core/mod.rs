//! # Core Engine Module
//!
//! Shared configuration types used by every subsystem of the tracking engine.

pub mod config;

// Re-export commonly used config types
pub use config::{
    CalibrationFileConfig,
    TrackingConfig,
    TrackingSettings,
    DEFAULT_CALIBRATION_FILE_NAME,
};
pub use crate::config::{Config, ConfigError};
