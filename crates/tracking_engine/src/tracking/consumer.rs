//! Receiving side of the tracking stream

use crate::foundation::math::{Point3, Quat};

/// Mapped pose of one tracked entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityPose {
    /// Position in the virtual frame
    pub position: Point3,
    /// Whether the vertical component should be applied
    pub apply_vertical: bool,
    /// Orientation in the virtual frame, `None` when rotation is disabled
    pub rotation: Option<Quat>,
}

impl EntityPose {
    /// Position to apply to an entity currently at `current`
    ///
    /// Keeps the current height when the vertical axis is disabled.
    pub fn resolve_position(&self, current: Point3) -> Point3 {
        if self.apply_vertical {
            self.position
        } else {
            Point3::new(self.position.x, current.y, self.position.z)
        }
    }
}

/// Scene side that applies mapped poses
pub trait PoseConsumer {
    /// Show or hide an entity
    fn set_active(&mut self, entity: usize, active: bool);

    /// Apply the pose of an entity
    fn set_pose(&mut self, entity: usize, pose: &EntityPose);

    /// Show the calibration markers at the given positions
    fn set_marker_positions(&mut self, _positions: &[Point3]) {}
}
