//! Calibration data types

use std::sync::{Arc, PoisonError, RwLock};

use crate::foundation::math::{Point3, Quat, Size};

use super::CalibrationError;

/// Number of points sampled per calibration session
pub const CALIBRATION_POINT_COUNT: usize = 5;

/// Number of base corners among the calibration points
pub const BASE_CORNER_COUNT: usize = 4;

/// The five points of one calibration session
///
/// Points 0 to 3 are the base corners in winding order, point 4 is the "up"
/// reference above the base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationPoints([Point3; CALIBRATION_POINT_COUNT]);

impl CalibrationPoints {
    /// Wrap exactly five points
    pub fn new(points: [Point3; CALIBRATION_POINT_COUNT]) -> Self {
        Self(points)
    }

    /// The four base corners
    pub fn base(&self) -> &[Point3] {
        &self.0[..BASE_CORNER_COUNT]
    }

    /// The reference point above the base
    pub fn apex(&self) -> Point3 {
        self.0[BASE_CORNER_COUNT]
    }

    /// All five points
    pub fn as_slice(&self) -> &[Point3] {
        &self.0
    }
}

impl TryFrom<&[Point3]> for CalibrationPoints {
    type Error = CalibrationError;

    fn try_from(points: &[Point3]) -> Result<Self, Self::Error> {
        let points: [Point3; CALIBRATION_POINT_COUNT] =
            points.try_into().map_err(|_| CalibrationError::PointCount {
                expected: CALIBRATION_POINT_COUNT,
                found: points.len(),
            })?;
        Ok(Self(points))
    }
}

/// Rigid and scale mapping from the physical frame to the virtual frame
///
/// Immutable once built: recalibration replaces the whole value.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    center: Point3,
    rotation_offset: Quat,
    real_world_size: Size,
    valid: bool,
}

impl Calibration {
    /// Create a valid calibration
    pub fn new(center: Point3, rotation_offset: Quat, real_world_size: Size) -> Self {
        Self {
            center,
            rotation_offset,
            real_world_size,
            valid: true,
        }
    }

    /// The cleared state: mapping falls back to passthrough
    pub fn invalid() -> Self {
        Self {
            center: Point3::origin(),
            rotation_offset: Quat::identity(),
            real_world_size: Size::new(1.0, 1.0, 1.0),
            valid: false,
        }
    }

    /// Physical point the mapping pivots around
    pub fn center(&self) -> Point3 {
        self.center
    }

    /// Rotation carrying the virtual axes onto the physical base axes
    pub fn rotation_offset(&self) -> Quat {
        self.rotation_offset
    }

    /// Measured extent of the physical volume
    pub fn real_world_size(&self) -> Size {
        self.real_world_size
    }

    /// Whether the calibrated mapping branch applies
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Handle to the process-wide active calibration
///
/// Cloning the handle shares the same slot. Writers swap in a complete
/// `Arc<Calibration>`; readers take a snapshot that stays consistent for as
/// long as they hold it.
#[derive(Debug, Clone, Default)]
pub struct SharedCalibration {
    slot: Arc<RwLock<Arc<Calibration>>>,
}

impl SharedCalibration {
    /// Create a handle holding `calibration`
    pub fn new(calibration: Calibration) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Arc::new(calibration))),
        }
    }

    /// Current calibration
    pub fn snapshot(&self) -> Arc<Calibration> {
        // A poisoned lock still holds a complete value since writes are swaps
        let guard = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replace the current calibration
    pub fn publish(&self, calibration: Calibration) {
        let next = Arc::new(calibration);
        let mut guard = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
    }

    /// Reset to the cleared, invalid calibration
    pub fn clear(&self) {
        self.publish(Calibration::invalid());
    }

    /// Whether the current calibration is valid
    pub fn is_calibrated(&self) -> bool {
        self.snapshot().is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    #[test]
    fn test_points_require_exactly_five() {
        let four = [Point3::origin(); 4];
        let six = [Point3::origin(); 6];

        assert_eq!(
            CalibrationPoints::try_from(&four[..]),
            Err(CalibrationError::PointCount { expected: 5, found: 4 })
        );
        assert_eq!(
            CalibrationPoints::try_from(&six[..]),
            Err(CalibrationError::PointCount { expected: 5, found: 6 })
        );
        assert!(CalibrationPoints::try_from(&[Point3::origin(); 5][..]).is_ok());
    }

    #[test]
    fn test_invalid_calibration_defaults() {
        let calibration = Calibration::default();
        assert!(!calibration.is_valid());
        assert_eq!(calibration.center(), Point3::origin());
        assert_eq!(calibration.real_world_size(), Size::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_snapshot_survives_publish() {
        let shared = SharedCalibration::default();
        let before = shared.snapshot();
        assert!(!shared.is_calibrated());

        let calibration = Calibration::new(Point3::new(1.0, 2.0, 3.0), Quat::identity(), Vec3::new(4.0, 5.0, 6.0));
        shared.clone().publish(calibration.clone());

        assert!(!before.is_valid());
        assert_eq!(*shared.snapshot(), calibration);

        shared.clear();
        assert!(!shared.is_calibrated());
    }

    #[test]
    fn test_publish_is_visible_across_threads() {
        let shared = SharedCalibration::default();
        let writer = shared.clone();
        let calibration = Calibration::new(Point3::new(1.0, 0.0, 0.0), Quat::identity(), Vec3::new(2.0, 2.0, 2.0));
        let expected = calibration.clone();

        std::thread::spawn(move || writer.publish(calibration))
            .join()
            .unwrap();

        assert_eq!(*shared.snapshot(), expected);
    }
}
