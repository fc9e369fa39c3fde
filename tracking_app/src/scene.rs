//! Logging stand-ins for the scene and the status display

use tracking_engine::prelude::*;

/// How often entity positions are written to the log
const LOG_EVERY_N_UPDATES: u64 = 100;

/// Scene that keeps entity positions and logs them
#[derive(Default)]
pub struct LoggingScene {
    positions: Vec<Point3>,
    active: Vec<bool>,
    updates: u64,
}

impl LoggingScene {
    /// Current position of an entity
    pub fn position(&self, entity: usize) -> Option<Point3> {
        self.positions.get(entity).copied()
    }

    fn ensure(&mut self, entity: usize) {
        if entity >= self.positions.len() {
            self.positions.resize(entity + 1, Point3::new(0.0, 1.7, 0.0));
            self.active.resize(entity + 1, false);
        }
    }
}

impl PoseConsumer for LoggingScene {
    fn set_active(&mut self, entity: usize, active: bool) {
        self.ensure(entity);
        self.active[entity] = active;
        log::info!("Entity {entity} {}", if active { "activated" } else { "deactivated" });
    }

    fn set_pose(&mut self, entity: usize, pose: &EntityPose) {
        self.ensure(entity);
        if !self.active[entity] {
            return;
        }
        self.positions[entity] = pose.resolve_position(self.positions[entity]);
        self.updates += 1;

        if self.updates % LOG_EVERY_N_UPDATES == 0 {
            let p = self.positions[entity];
            log::info!("Entity {entity} at ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z);
        }
    }

    fn set_marker_positions(&mut self, positions: &[Point3]) {
        log::debug!("Calibration markers at {positions:?}");
    }
}

/// Writes status events to the log
pub struct StatusLogger;

impl EventHandler for StatusLogger {
    fn on_event(&mut self, event: &StatusEvent) -> bool {
        match event {
            StatusEvent::CalibrationLoaded(summary) | StatusEvent::CalibrationCompleted(summary) => {
                let (c, s) = (summary.center, summary.real_world_size);
                log::info!(
                    "{} Center: ({:.3}, {:.3}, {:.3}) Size: ({:.3}, {:.3}, {:.3}) Rotation: {:?}",
                    event.status_text(),
                    c.x,
                    c.y,
                    c.z,
                    s.x,
                    s.y,
                    s.z,
                    summary.rotation_offset.euler_angles()
                );
            }
            StatusEvent::LoadFailed { reason }
            | StatusEvent::SaveRejected { reason }
            | StatusEvent::RemoveFailed { reason } => {
                log::warn!("{} ({reason})", event.status_text());
            }
            StatusEvent::ProviderDiscrepancy { configured, detected, .. } => {
                log::warn!("{}: {configured} configured, {detected} detected", event.status_text());
            }
            _ => log::info!("{}", event.status_text()),
        }
        false
    }
}
