//! Calibration session state machine
//!
//! `Idle → Step(0..4) → Validating → Calibrated | Idle`
//!
//! Each recorded point advances one step. The fifth point triggers validation;
//! a consistent set is solved and published, an inconsistent one is discarded.
//! The published calibration only changes on success.

use thiserror::Error;

use crate::foundation::math::Point3;
use crate::foundation::time::Tween;
use crate::mapping::CoordinateMapper;

use super::model::{Calibration, CalibrationPoints, SharedCalibration, CALIBRATION_POINT_COUNT};
use super::solver::TransformSolver;
use super::validator::ConsistencyValidator;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session running
    Idle,
    /// Waiting for the point with this index
    Step(usize),
    /// All points recorded, checking them
    Validating,
    /// The last session published a calibration
    Calibrated,
}

/// What recording a point led to
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Waiting for the point with this index
    AwaitingPoint(usize),
    /// The session published this calibration
    Calibrated(Calibration),
    /// The points were inconsistent and were discarded
    Rejected,
}

/// Session events out of order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A point arrived while no session was waiting for one
    #[error("No calibration session is waiting for a point (state {0:?})")]
    NotActive(SessionState),
}

/// Drives one calibration session at a time
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    state: SessionState,
    pending: Vec<Point3>,
    validator: ConsistencyValidator,
    solver: TransformSolver,
    active: SharedCalibration,
    settle_secs: f64,
    markers: Vec<Tween<Point3>>,
}

impl CalibrationSession {
    /// Create an idle session publishing into `active`
    pub fn new(validator: ConsistencyValidator, solver: TransformSolver, active: SharedCalibration) -> Self {
        Self {
            state: SessionState::Idle,
            pending: Vec::with_capacity(CALIBRATION_POINT_COUNT),
            validator,
            solver,
            active,
            settle_secs: 0.0,
            markers: Vec::new(),
        }
    }

    /// Builder pattern: duration of the marker settle animation
    pub fn with_marker_settle(mut self, seconds: f64) -> Self {
        self.settle_secs = seconds.max(0.0);
        self
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the session is waiting for points
    pub fn is_collecting(&self) -> bool {
        matches!(self.state, SessionState::Step(_))
    }

    /// Points recorded so far
    pub fn pending_points(&self) -> &[Point3] {
        &self.pending
    }

    /// Start a new session, discarding any pending points
    pub fn start(&mut self) {
        self.pending.clear();
        self.markers.clear();
        self.state = SessionState::Step(0);
        log::info!("Calibration session started");
    }

    /// Abandon the session
    ///
    /// Returns whether a session was running. The published calibration is
    /// left untouched.
    pub fn cancel(&mut self) -> bool {
        let was_collecting = self.is_collecting();
        self.pending.clear();
        if was_collecting {
            self.state = SessionState::Idle;
            log::info!("Calibration session cancelled");
        }
        was_collecting
    }

    /// Record the next sampled point
    ///
    /// `mapper` is used for the marker animation of a successful session.
    ///
    /// # Errors
    /// [`SessionError::NotActive`] unless the session is waiting for a point.
    pub fn record_point(&mut self, point: Point3, mapper: &CoordinateMapper) -> Result<SessionOutcome, SessionError> {
        let SessionState::Step(step) = self.state else {
            return Err(SessionError::NotActive(self.state));
        };

        self.pending.push(point);
        log::debug!("Calibration point {step} recorded at {point:?}");

        if step + 1 < CALIBRATION_POINT_COUNT {
            self.state = SessionState::Step(step + 1);
            return Ok(SessionOutcome::AwaitingPoint(step + 1));
        }

        self.state = SessionState::Validating;
        Ok(self.finish(mapper))
    }

    fn finish(&mut self, mapper: &CoordinateMapper) -> SessionOutcome {
        let points = std::mem::take(&mut self.pending);
        let solved = CalibrationPoints::try_from(points.as_slice())
            .ok()
            .filter(|set| self.validator.check_points(set))
            .map(|set| self.solver.solve_points(&set));

        match solved {
            Some(Ok(calibration)) => {
                self.active.publish(calibration.clone());
                self.markers = points
                    .iter()
                    .map(|raw| {
                        let settled = mapper.without_remap().map_position(raw, true, &calibration);
                        Tween::new(*raw, settled, self.settle_secs)
                    })
                    .collect();
                self.state = SessionState::Calibrated;
                log::info!("Calibration completed");
                SessionOutcome::Calibrated(calibration)
            }
            Some(Err(e)) => {
                log::warn!("Calibration points could not be solved: {e}");
                self.state = SessionState::Idle;
                SessionOutcome::Rejected
            }
            None => {
                log::warn!("Calibration points are not consistent, please calibrate again");
                self.state = SessionState::Idle;
                SessionOutcome::Rejected
            }
        }
    }

    /// Advance the marker settle animation
    ///
    /// Returns the current marker positions and whether they have all
    /// settled, or `None` when no animation is running.
    pub fn tick(&mut self, delta_time: f64) -> Option<(Vec<Point3>, bool)> {
        if self.markers.is_empty() {
            return None;
        }

        let mut complete = true;
        let positions = self
            .markers
            .iter_mut()
            .map(|marker| {
                let (position, done) = marker.tick(delta_time);
                complete &= done;
                position
            })
            .collect();

        if complete {
            self.markers.clear();
        }
        Some((positions, complete))
    }
}
