//! Calibration of the physical tracking volume
//!
//! A calibration session samples five points with a tracker: the four corners
//! of a right-angled base and one reference point straight above it. The
//! [`ConsistencyValidator`] checks their geometry, the [`TransformSolver`]
//! derives a [`Calibration`] from them, and the [`CalibrationStore`] persists
//! it between runs.

pub mod model;
pub mod validator;
pub mod solver;
pub mod store;
pub mod session;

pub use model::{
    Calibration, CalibrationPoints, SharedCalibration, BASE_CORNER_COUNT, CALIBRATION_POINT_COUNT,
};
pub use session::{CalibrationSession, SessionError, SessionOutcome, SessionState};
pub use solver::TransformSolver;
pub use store::{CalibrationStore, RemoveOutcome, StoreError};
pub use validator::{ConsistencyValidator, DEFAULT_TOLERANCE};

use thiserror::Error;

/// Precondition violations of calibration operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalibrationError {
    /// Wrong number of calibration points
    #[error("There must be {expected} calibration points, got {found}")]
    PointCount {
        /// Required number of points
        expected: usize,
        /// Number of points supplied
        found: usize,
    },

    /// Points that do not span a volume
    #[error("Degenerate calibration points: {0}")]
    Degenerate(String),
}
