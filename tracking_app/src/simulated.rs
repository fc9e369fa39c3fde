//! Simulated tracking rig
//!
//! Stands in for the device driver: a tracker that is either held still at a
//! point or carried around a circle, seen by a rig whose axes are yawed and
//! offset from the room.

use rand::Rng;
use tracking_engine::prelude::*;
use tracking_engine::tracking::SAMPLE_STRIDE;

/// How the simulated tracker moves
#[derive(Debug, Clone, Copy)]
enum Motion {
    Hold(Point3),
    Orbit { center: Point3, radius: f64, angle: f64, step: f64 },
}

/// Rig placement in the room
#[derive(Debug, Clone, Copy)]
pub struct RigLayout {
    yaw: Quat,
    offset: Vec3,
}

impl RigLayout {
    /// Rig yawed by `yaw_radians` and shifted by `offset`
    pub fn new(yaw_radians: f64, offset: Vec3) -> Self {
        Self {
            yaw: Quat::from_euler_angles(0.0, yaw_radians, 0.0),
            offset,
        }
    }

    /// Room position as seen by the rig
    pub fn to_rig(&self, room: Point3) -> Point3 {
        Point3::from(self.yaw * room.coords + self.offset)
    }

    /// The five calibration points of a `width` x `depth` base with the
    /// reference point `height` above its center
    pub fn calibration_points(&self, width: f64, depth: f64, height: f64) -> [Point3; 5] {
        let (w, d) = (width / 2.0, depth / 2.0);
        [
            Point3::new(-w, 0.0, -d),
            Point3::new(w, 0.0, -d),
            Point3::new(w, 0.0, d),
            Point3::new(-w, 0.0, d),
            Point3::new(0.0, height, 0.0),
        ]
        .map(|p| self.to_rig(p))
    }
}

/// Provider producing jittered samples of a scripted tracker
pub struct SimulatedProvider {
    rig: RigLayout,
    motion: Motion,
    jitter: f64,
    entities: usize,
    base_stations: usize,
    started: bool,
}

impl SimulatedProvider {
    /// Create a provider reporting the given hardware
    pub fn new(rig: RigLayout, entities: usize, base_stations: usize, jitter: f64) -> Self {
        Self {
            rig,
            motion: Motion::Hold(rig.to_rig(Point3::origin())),
            jitter,
            entities,
            base_stations,
            started: false,
        }
    }

    /// Rig placement
    pub fn rig(&self) -> RigLayout {
        self.rig
    }

    /// Hold the tracker still at a rig position
    pub fn hold(&mut self, position: Point3) {
        self.motion = Motion::Hold(position);
    }

    /// Carry the tracker around a circle in the room, `step` radians per poll
    pub fn orbit(&mut self, center: Point3, radius: f64, step: f64) {
        self.motion = Motion::Orbit { center, radius, angle: 0.0, step };
    }

    fn advance(&mut self) -> (Point3, Quat) {
        match &mut self.motion {
            Motion::Hold(position) => (*position, Quat::identity()),
            Motion::Orbit { center, radius, angle, step } => {
                *angle += *step;
                let room = *center + Vec3::new(angle.cos(), 0.0, angle.sin()) * *radius;
                let heading = Quat::from_euler_angles(0.0, -*angle, 0.0);
                (self.rig.to_rig(room), self.rig.yaw * heading)
            }
        }
    }
}

impl TrackingProvider for SimulatedProvider {
    fn start(&mut self, entities: usize, base_stations: usize) -> Result<(), ProviderError> {
        log::info!("Simulated rig started for {entities} trackers and {base_stations} base stations");
        self.started = true;
        Ok(())
    }

    fn detected_entities(&self) -> usize {
        self.entities
    }

    fn detected_base_stations(&self) -> usize {
        self.base_stations
    }

    fn poll(&mut self, request: &PollRequest, buffer: &mut [f32]) -> Result<(), ProviderError> {
        if !self.started {
            return Err(ProviderError::PollFailed("simulated rig not started".to_string()));
        }
        let required = request.entity_count * SAMPLE_STRIDE;
        if buffer.len() < required {
            return Err(ProviderError::BufferTooSmall { required, available: buffer.len() });
        }

        let (position, rotation) = self.advance();
        let mut rng = rand::thread_rng();
        for (entity, out) in buffer.chunks_exact_mut(SAMPLE_STRIDE).take(request.entity_count).enumerate() {
            let spread = Vec3::new(entity as f64 * 0.5, 0.0, 0.0);
            let noise = Vec3::from_fn(|_, _| rng.gen_range(-self.jitter..=self.jitter));
            RawSample { position: position + spread + noise, rotation }.write_to(out);
        }
        Ok(())
    }

    fn stop(&mut self) {
        log::info!("Simulated rig stopped");
        self.started = false;
    }
}
