//! Geometric consistency check of the five calibration points
//!
//! The base corners must form a right-angled quadrilateral and the reference
//! point must sit on the line through the base centroid along the base normal.
//! All comparisons are made on normalized vectors so the tolerance does not
//! depend on the size of the rig.

use crate::foundation::math::{utils, Point3, Vec3};

use super::model::{CalibrationPoints, BASE_CORNER_COUNT};
use super::CalibrationError;

/// Allowed deviation of the cosines from their ideal values
pub const DEFAULT_TOLERANCE: f64 = 0.03;

/// Rounding slack so a configuration built at exactly the tolerance passes
const BOUNDARY_SLACK: f64 = 1e-9;

/// Checks that sampled points describe a usable calibration volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsistencyValidator {
    tolerance: f64,
}

impl Default for ConsistencyValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsistencyValidator {
    /// Create a validator with the default tolerance
    pub fn new() -> Self {
        Self::with_tolerance(DEFAULT_TOLERANCE)
    }

    /// Create a validator with a custom tolerance
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Tolerance in use
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Check the five calibration points
    ///
    /// # Errors
    /// [`CalibrationError::PointCount`] unless exactly five points are given.
    pub fn check(&self, points: &[Point3]) -> Result<bool, CalibrationError> {
        let points = CalibrationPoints::try_from(points)?;
        Ok(self.check_points(&points))
    }

    /// Check an already counted point set
    pub fn check_points(&self, points: &CalibrationPoints) -> bool {
        if !self.base_is_rectangular(points.base()) {
            log::debug!("Calibration base rejected: corner angle outside tolerance");
            return false;
        }

        let Some(normal) = base_normal(points) else {
            log::debug!("Calibration base rejected: no plane normal");
            return false;
        };

        let to_apex = points.apex() - centroid(points);
        let aligned = utils::cos_between(&to_apex, &normal)
            .is_some_and(|cos| cos.abs() >= 1.0 - self.tolerance - BOUNDARY_SLACK);
        if !aligned {
            log::debug!("Calibration apex rejected: not above the base centroid");
        }
        aligned
    }

    /// Whether every corner of the base is close to a right angle
    fn base_is_rectangular(&self, base: &[Point3]) -> bool {
        (0..BASE_CORNER_COUNT).all(|i| {
            let corner = base[(i + 1) % BASE_CORNER_COUNT];
            let to_previous = base[i] - corner;
            let to_next = base[(i + 2) % BASE_CORNER_COUNT] - corner;
            utils::cos_between(&to_previous, &to_next)
                .is_some_and(|cos| cos.abs() <= self.tolerance + BOUNDARY_SLACK)
        })
    }
}

/// Unit normal of the base plane, oriented with a non-negative Y component
///
/// Averages the normals of the four corner triangles after aligning them to
/// the first one. `None` if the base is degenerate.
pub fn base_normal(points: &CalibrationPoints) -> Option<Vec3> {
    let base = points.base();
    let mut normals = (0..BASE_CORNER_COUNT).map(|i| {
        let corner = base[i];
        let previous = base[(i + BASE_CORNER_COUNT - 1) % BASE_CORNER_COUNT];
        let next = base[(i + 1) % BASE_CORNER_COUNT];
        utils::try_normalize(&(previous - corner).cross(&(next - corner)))
    });

    let reference = normals.next()??;
    let mut sum = reference;
    for normal in normals {
        let normal = normal?;
        sum += if reference.dot(&normal) < 0.0 { -normal } else { normal };
    }

    // The reference point is never below the base on the physical rig
    let average = utils::try_normalize(&sum)?;
    Some(if average.y < 0.0 { -average } else { average })
}

/// Mean of the four base corners
pub fn centroid(points: &CalibrationPoints) -> Point3 {
    utils::mean_point(points.base())
}
