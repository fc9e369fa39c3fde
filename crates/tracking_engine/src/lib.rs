//! # Tracking Engine
//!
//! Calibrates a physical motion-tracking rig and maps its poses into a
//! virtual scene.
//!
//! ## Features
//!
//! - **Five-point calibration**: a right-angled base plus one point above it
//! - **Consistency checks**: rejects sessions whose points are not square
//! - **Per-axis mapping**: the physical base stretches onto the virtual volume
//! - **Persistence**: the calibration survives restarts as a small JSON record
//! - **Axis remapping**: rigs wired with swapped or inverted axes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tracking_engine::prelude::*;
//!
//! struct Scene;
//!
//! impl PoseConsumer for Scene {
//!     fn set_active(&mut self, entity: usize, active: bool) {
//!         log::info!("Entity {entity} active: {active}");
//!     }
//!
//!     fn set_pose(&mut self, entity: usize, pose: &EntityPose) {
//!         log::info!("Entity {entity} at {:?}", pose.position);
//!     }
//! }
//!
//! fn run<P: TrackingProvider>(provider: P) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TrackingConfig::load_or_default("tracking.toml")?;
//!     let mut engine = TrackingEngine::new(config, provider)?;
//!     let mut scene = Scene;
//!
//!     engine.start(&mut scene)?;
//!     engine.run(&mut scene, |engine| engine.tick_count() < 1000);
//!     engine.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Shared configuration types
pub mod core;

pub mod foundation;
pub mod config;
pub mod calibration;
pub mod mapping;
pub mod tracking;
pub mod events;

mod engine;

pub use engine::{EngineError, TrackingEngine};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        EngineError, TrackingEngine,
        calibration::{
            Calibration, CalibrationSession, CalibrationStore, ConsistencyValidator, SessionOutcome,
            SessionState, SharedCalibration, TransformSolver,
        },
        core::{Config, TrackingConfig, TrackingSettings},
        events::{EventHandler, EventKind, EventSystem, StatusEvent},
        foundation::math::{Point3, Quat, Size, Vec3},
        mapping::{AxisRemap, CoordinateMapper},
        tracking::{EntityPose, PollRequest, PoseConsumer, ProviderError, RawSample, TrackingProvider},
    };
}
