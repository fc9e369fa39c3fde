//! Derivation of the calibration transform from validated points
//!
//! Convention: the physical frame is spanned by
//! - `right`: the base edge from point 0 to point 1, projected onto the base plane
//! - `up`: the base normal
//! - `forward`: `right × up`
//!
//! `rotation_offset` is the rotation whose matrix columns are
//! `(right, up, forward)`, so its inverse takes a physical offset from the
//! center into virtual axes. The real-world size is the extent of the volume
//! along those axes and is later divided into the target size per axis.

use crate::foundation::math::{utils, Matrix3, Point3, Quat, Rotation3, Size, Vec3, EPSILON};

use super::model::{Calibration, CalibrationPoints};
use super::validator::{base_normal, centroid};
use super::CalibrationError;

/// Builds a [`Calibration`] from five validated points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSolver {
    target_size: Size,
}

impl TransformSolver {
    /// Create a solver for the given virtual volume
    pub fn new(target_size: Size) -> Self {
        Self { target_size }
    }

    /// Virtual volume the physical base maps onto
    pub fn target_size(&self) -> Size {
        self.target_size
    }

    /// Derive the calibration
    ///
    /// The points are expected to have passed the
    /// [`ConsistencyValidator`](super::ConsistencyValidator); they are not
    /// checked again.
    ///
    /// # Errors
    /// [`CalibrationError::PointCount`] unless exactly five points are given,
    /// [`CalibrationError::Degenerate`] if they do not span a volume.
    pub fn solve(&self, points: &[Point3]) -> Result<Calibration, CalibrationError> {
        let points = CalibrationPoints::try_from(points)?;
        self.solve_points(&points)
    }

    /// Derive the calibration from an already counted point set
    ///
    /// # Errors
    /// [`CalibrationError::Degenerate`] if the points do not span a volume.
    pub fn solve_points(&self, points: &CalibrationPoints) -> Result<Calibration, CalibrationError> {
        let base = points.base();
        let center = centroid(points);

        let up = base_normal(points)
            .ok_or_else(|| CalibrationError::Degenerate("base has no plane normal".to_string()))?;
        let edge = base[1] - base[0];
        let right = utils::try_normalize(&(edge - up * edge.dot(&up)))
            .ok_or_else(|| CalibrationError::Degenerate("first base edge is parallel to the normal".to_string()))?;
        let forward = right.cross(&up);

        let basis = Matrix3::from_columns(&[right, up, forward]);
        let rotation_offset = Quat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis));

        let along = |a: &Point3, b: &Point3, axis: &Vec3| (b - a).dot(axis).abs();
        let real_world_size = Size::new(
            (along(&base[0], &base[1], &right) + along(&base[3], &base[2], &right)) * 0.5,
            along(&center, &points.apex(), &up),
            (along(&base[0], &base[3], &forward) + along(&base[1], &base[2], &forward)) * 0.5,
        );
        if real_world_size.iter().any(|extent| *extent <= EPSILON) {
            return Err(CalibrationError::Degenerate(format!(
                "calibration volume is flat: {real_world_size:?}"
            )));
        }

        log::info!(
            "Calibration solved: center {:?}, size {:?}, scale {:?}",
            center,
            real_world_size,
            utils::safe_ratio(&self.target_size, &real_world_size)
        );

        Ok(Calibration::new(center, rotation_offset, real_world_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_points() -> [Point3; 5] {
        [
            Point3::new(-5.0, 0.0, -5.0),
            Point3::new(5.0, 0.0, -5.0),
            Point3::new(5.0, 0.0, 5.0),
            Point3::new(-5.0, 0.0, 5.0),
            Point3::new(0.0, 10.0, 0.0),
        ]
    }

    #[test]
    fn test_axis_aligned_square() {
        let solver = TransformSolver::new(Size::new(20.0, 20.0, 20.0));
        let calibration = solver.solve(&square_points()).unwrap();

        assert!(calibration.is_valid());
        assert_relative_eq!(calibration.center(), Point3::origin(), epsilon = 1e-12);
        assert_relative_eq!(calibration.rotation_offset(), Quat::identity(), epsilon = 1e-12);
        assert_relative_eq!(calibration.real_world_size(), Size::new(10.0, 10.0, 10.0), epsilon = 1e-12);
    }

    #[test]
    fn test_rectangle_measures_each_axis() {
        let points = [
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(4.0, 1.0, 0.0),
            Point3::new(4.0, 1.0, 2.0),
            Point3::new(0.0, 1.0, 2.0),
            Point3::new(2.0, 3.5, 1.0),
        ];
        let calibration = TransformSolver::new(Size::new(1.0, 1.0, 1.0)).solve(&points).unwrap();

        assert_relative_eq!(calibration.center(), Point3::new(2.0, 1.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(calibration.real_world_size(), Size::new(4.0, 2.5, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_recovers_rig_pose() {
        let rig_rotation = Quat::from_euler_angles(0.1, 0.7, 0.05);
        let rig_offset = Vec3::new(3.0, 1.5, -2.0);
        let physical = square_points().map(|p| Point3::from(rig_rotation * p.coords + rig_offset));

        let calibration = TransformSolver::new(Size::new(10.0, 10.0, 10.0)).solve(&physical).unwrap();

        assert_relative_eq!(calibration.center(), Point3::from(rig_offset), epsilon = 1e-9);
        assert_relative_eq!(calibration.real_world_size(), Size::new(10.0, 10.0, 10.0), epsilon = 1e-9);

        // Every physical point is carried back onto its place in the square
        let inverse = calibration.rotation_offset().inverse();
        for (raw, expected) in physical.iter().zip(square_points().iter()) {
            let local = inverse * (raw - calibration.center());
            assert_relative_eq!(local, expected.coords, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_wrong_point_count() {
        let solver = TransformSolver::new(Size::new(1.0, 1.0, 1.0));
        assert_eq!(
            solver.solve(&square_points()[..3]),
            Err(CalibrationError::PointCount { expected: 5, found: 3 })
        );
    }

    #[test]
    fn test_flat_volume_is_degenerate() {
        let mut points = square_points();
        points[4] = Point3::origin();
        let result = TransformSolver::new(Size::new(1.0, 1.0, 1.0)).solve(&points);
        assert!(matches!(result, Err(CalibrationError::Degenerate(_))));
    }
}
