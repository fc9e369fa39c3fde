//! Math utilities and types
//!
//! Provides the fundamental math types used for tracking calibration. The
//! tracking frame is Y-up; all geometry is computed in double precision while
//! the provider stream itself is single precision.

pub use nalgebra::{Matrix3, Quaternion, Rotation3, Vector3};

/// 3D vector type
pub type Vec3 = Vector3<f64>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f64>;

/// Quaternion type for rotations
pub type Quat = nalgebra::UnitQuaternion<f64>;

/// Extents of a volume along X, Y and Z
pub type Size = Vec3;

/// Length below which a vector is treated as degenerate
pub const EPSILON: f64 = 1e-9;

/// Values that can be linearly interpolated
pub trait Lerp: Copy {
    /// Interpolate from `self` towards `target`, `t` in `[0, 1]`
    fn lerp_to(&self, target: &Self, t: f64) -> Self;
}

impl Lerp for Point3 {
    fn lerp_to(&self, target: &Self, t: f64) -> Self {
        self + (target - self) * t
    }
}

/// Math utility functions
pub mod utils {
    use super::{Point3, Vec3, EPSILON};

    /// Clamp a value between min and max
    pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
        if value < min { min } else if value > max { max } else { value }
    }

    /// Normalize a vector, `None` if it is too short to carry a direction
    pub fn try_normalize(vector: &Vec3) -> Option<Vec3> {
        vector.try_normalize(EPSILON)
    }

    /// Cosine of the angle between two vectors
    ///
    /// Both vectors are normalized first so the result is independent of
    /// their lengths. Degenerate input yields `None`.
    pub fn cos_between(a: &Vec3, b: &Vec3) -> Option<f64> {
        Some(try_normalize(a)?.dot(&try_normalize(b)?))
    }

    /// Arithmetic mean of a set of points
    pub fn mean_point(points: &[Point3]) -> Point3 {
        if points.is_empty() {
            return Point3::origin();
        }
        let sum = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / points.len() as f64)
    }

    /// Component-wise `numerator / denominator`, axes with a zero
    /// denominator keep a ratio of one
    pub fn safe_ratio(numerator: &Vec3, denominator: &Vec3) -> Vec3 {
        Vec3::from_fn(|i, _| {
            if denominator[i].abs() <= EPSILON {
                1.0
            } else {
                numerator[i] / denominator[i]
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cos_between_is_scale_independent() {
        let a = Vec3::new(3.0, 0.0, 0.0);
        let b = Vec3::new(100.0, 100.0, 0.0);
        let cos = utils::cos_between(&a, &b).unwrap();
        assert_relative_eq!(cos, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn test_cos_between_degenerate() {
        assert!(utils::cos_between(&Vec3::zeros(), &Vec3::x()).is_none());
    }

    #[test]
    fn test_mean_point() {
        let points = [
            Point3::new(-5.0, 0.0, -5.0),
            Point3::new(5.0, 0.0, -5.0),
            Point3::new(5.0, 2.0, 5.0),
            Point3::new(-5.0, 2.0, 5.0),
        ];
        assert_relative_eq!(utils::mean_point(&points), Point3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_safe_ratio_skips_zero_axes() {
        let ratio = utils::safe_ratio(&Vec3::new(10.0, 4.0, 6.0), &Vec3::new(5.0, 0.0, 3.0));
        assert_relative_eq!(ratio, Vec3::new(2.0, 1.0, 2.0));
    }

    #[test]
    fn test_point_lerp() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 4.0, -6.0);
        assert_relative_eq!(a.lerp_to(&b, 0.5), Point3::new(1.0, 2.0, -3.0));
    }
}
