//! Per-sample coordinate mapping
//!
//! Raw poses first go through the axis remap describing how the physical rig
//! is wired, then through the active [`Calibration`] when it is valid.

use bitflags::bitflags;

use crate::calibration::Calibration;
use crate::foundation::math::{utils, Point3, Quat, Quaternion, Size};

bitflags! {
    /// Axis remapping of the raw tracking stream
    ///
    /// Applied in declaration order: invert X, invert Z, then swap X and Z.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AxisRemap: u8 {
        /// Negate the X axis
        const INVERT_X = 0b001;
        /// Negate the Z axis
        const INVERT_Z = 0b010;
        /// Exchange the X and Z axes
        const SWAP_XZ = 0b100;
    }
}

impl AxisRemap {
    /// Remap a position
    pub fn apply_position(self, position: &Point3) -> Point3 {
        let mut p = *position;
        if self.contains(Self::INVERT_X) {
            p.x = -p.x;
        }
        if self.contains(Self::INVERT_Z) {
            p.z = -p.z;
        }
        if self.contains(Self::SWAP_XZ) {
            p.coords.swap_rows(0, 2);
        }
        p
    }

    /// Remap a rotation
    ///
    /// Each remap step is a reflection `M`; the rotation is conjugated to
    /// `M R M`, which keeps it a proper rotation. On the quaternion the
    /// rotation axis transforms as a pseudo-vector, `-M a`, and the scalar
    /// part is unchanged.
    pub fn apply_rotation(self, rotation: &Quat) -> Quat {
        let q = rotation.quaternion();
        let (mut x, mut y, mut z) = (q.i, q.j, q.k);
        if self.contains(Self::INVERT_X) {
            y = -y;
            z = -z;
        }
        if self.contains(Self::INVERT_Z) {
            x = -x;
            y = -y;
        }
        if self.contains(Self::SWAP_XZ) {
            (x, y, z) = (-z, -y, -x);
        }
        Quat::new_unchecked(Quaternion::new(q.w, x, y, z))
    }
}

/// Maps raw samples into the virtual frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    remap: AxisRemap,
    target_size: Size,
}

impl CoordinateMapper {
    /// Create a mapper for the given rig wiring and virtual volume
    pub fn new(remap: AxisRemap, target_size: Size) -> Self {
        Self { remap, target_size }
    }

    /// Axis remap in use
    pub fn remap(&self) -> AxisRemap {
        self.remap
    }

    /// Virtual volume extents
    pub fn target_size(&self) -> Size {
        self.target_size
    }

    /// Mapper that applies the calibration only, for streams the provider
    /// already remapped
    pub fn without_remap(self) -> Self {
        Self {
            remap: AxisRemap::empty(),
            ..self
        }
    }

    /// Map a raw position
    ///
    /// With an invalid calibration the remapped raw position is returned.
    /// With `enable_y` off the vertical component of a calibrated result is
    /// zeroed; the consumer keeps its own height.
    pub fn map_position(&self, raw: &Point3, enable_y: bool, calibration: &Calibration) -> Point3 {
        let remapped = self.remap.apply_position(raw);
        if !calibration.is_valid() {
            return remapped;
        }

        let local = calibration.rotation_offset().inverse() * (remapped - calibration.center());
        let scale = utils::safe_ratio(&self.target_size, &calibration.real_world_size());
        let mut mapped = Point3::from(local.component_mul(&scale));
        if !enable_y {
            mapped.y = 0.0;
        }
        mapped
    }

    /// Map a raw rotation
    pub fn map_rotation(&self, raw: &Quat, calibration: &Calibration) -> Quat {
        let remapped = self.remap.apply_rotation(raw);
        if !calibration.is_valid() {
            return remapped;
        }
        calibration.rotation_offset().inverse() * remapped
    }
}
