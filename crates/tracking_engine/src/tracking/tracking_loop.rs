//! Per-tick polling, mapping and forwarding of tracked poses

use crate::calibration::SharedCalibration;
use crate::core::config::TrackingSettings;
use crate::foundation::math::Point3;
use crate::mapping::CoordinateMapper;

use super::consumer::{EntityPose, PoseConsumer};
use super::provider::{demultiplex, PollRequest, RawSample, TrackingProvider, SAMPLE_STRIDE};

/// Polls the provider and forwards mapped poses to a consumer
///
/// Each tick reads one snapshot of the shared calibration, so a calibration
/// published mid-tick only takes effect on the next tick.
pub struct TrackingLoop<P: TrackingProvider> {
    provider: P,
    mapper: CoordinateMapper,
    active: SharedCalibration,
    settings: TrackingSettings,
    buffer: Vec<f32>,
    last_samples: Vec<RawSample>,
    tick_count: u64,
}

impl<P: TrackingProvider> TrackingLoop<P> {
    /// Create a loop for `settings.number_of_players` entities
    pub fn new(provider: P, settings: TrackingSettings, active: SharedCalibration) -> Self {
        let mapper = CoordinateMapper::new(settings.axis_remap(), settings.virtual_world_space());
        let mapper = if provider.applies_axis_remap() {
            log::debug!("Provider remaps axes itself, mapping calibration only");
            mapper.without_remap()
        } else {
            mapper
        };

        let entities = settings.number_of_players;
        Self {
            provider,
            mapper,
            active,
            settings,
            buffer: vec![0.0; entities * SAMPLE_STRIDE],
            last_samples: Vec::with_capacity(entities),
            tick_count: 0,
        }
    }

    /// Mapper applied to the stream
    pub fn mapper(&self) -> CoordinateMapper {
        self.mapper
    }

    /// Tracking settings in use
    pub fn settings(&self) -> &TrackingSettings {
        &self.settings
    }

    /// Number of entities polled per tick
    pub fn entity_count(&self) -> usize {
        self.settings.number_of_players
    }

    /// Completed ticks
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Get the provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get mutable access to the provider
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// Latest axis-remapped raw position of an entity
    ///
    /// This is the frame calibration points are recorded in.
    pub fn last_raw_position(&self, entity: usize) -> Option<Point3> {
        self.last_samples.get(entity).map(|sample| sample.position)
    }

    /// Poll once and forward every mapped pose
    ///
    /// Returns the number of poses forwarded. A failed poll is logged and
    /// skipped; the previous raw samples are kept.
    pub fn tick(&mut self, consumer: &mut dyn PoseConsumer) -> usize {
        let request = PollRequest {
            entity_count: self.entity_count(),
            remap: self.settings.axis_remap(),
        };
        if let Err(e) = self.provider.poll(&request, &mut self.buffer) {
            log::warn!("Skipping tracking tick: {e}");
            return 0;
        }

        let samples = demultiplex(&self.buffer, request.entity_count);
        let calibration = self.active.snapshot();
        let remap = self.mapper.remap();

        self.last_samples.clear();
        for (entity, sample) in samples.iter().enumerate() {
            let position = self
                .mapper
                .map_position(&sample.position, self.settings.enable_y_axis, &calibration);
            let rotation = self
                .settings
                .enable_rotation
                .then(|| self.mapper.map_rotation(&sample.rotation, &calibration));

            let pose = EntityPose {
                position,
                apply_vertical: self.settings.enable_y_axis,
                rotation,
            };
            log::trace!("Entity {entity}: {pose:?}");
            consumer.set_pose(entity, &pose);

            self.last_samples.push(RawSample {
                position: remap.apply_position(&sample.position),
                rotation: remap.apply_rotation(&sample.rotation),
            });
        }

        self.tick_count += 1;
        samples.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::calibration::Calibration;
    use crate::foundation::math::{Quat, Size};
    use crate::mapping::AxisRemap;
    use crate::tracking::ProviderError;
    use approx::assert_relative_eq;

    /// Provider replaying fixed samples
    pub(crate) struct MockProvider {
        pub samples: Vec<RawSample>,
        pub remaps_itself: bool,
        pub fail_next_poll: bool,
        pub detected_entities: usize,
        pub detected_base_stations: usize,
        pub started: bool,
        pub polls: usize,
    }

    impl MockProvider {
        pub(crate) fn new(samples: Vec<RawSample>) -> Self {
            let detected_entities = samples.len();
            Self {
                samples,
                remaps_itself: false,
                fail_next_poll: false,
                detected_entities,
                detected_base_stations: 2,
                started: false,
                polls: 0,
            }
        }

        pub(crate) fn at(positions: &[Point3]) -> Self {
            Self::new(
                positions
                    .iter()
                    .map(|p| RawSample { position: *p, rotation: Quat::identity() })
                    .collect(),
            )
        }
    }

    impl TrackingProvider for MockProvider {
        fn start(&mut self, _entities: usize, _base_stations: usize) -> Result<(), ProviderError> {
            self.started = true;
            Ok(())
        }

        fn detected_entities(&self) -> usize {
            self.detected_entities
        }

        fn detected_base_stations(&self) -> usize {
            self.detected_base_stations
        }

        fn poll(&mut self, request: &PollRequest, buffer: &mut [f32]) -> Result<(), ProviderError> {
            self.polls += 1;
            if std::mem::take(&mut self.fail_next_poll) {
                return Err(ProviderError::PollFailed("device busy".to_string()));
            }
            for (sample, out) in self.samples.iter().zip(buffer.chunks_exact_mut(SAMPLE_STRIDE)) {
                let mut sample = *sample;
                if self.remaps_itself {
                    sample.position = request.remap.apply_position(&sample.position);
                }
                sample.write_to(out);
            }
            Ok(())
        }

        fn applies_axis_remap(&self) -> bool {
            self.remaps_itself
        }

        fn stop(&mut self) {
            self.started = false;
        }
    }

    /// Consumer recording the last pose of each entity
    #[derive(Default)]
    pub(crate) struct RecordingConsumer {
        pub poses: Vec<(usize, EntityPose)>,
        pub active: Vec<(usize, bool)>,
        pub markers: Vec<Point3>,
    }

    impl PoseConsumer for RecordingConsumer {
        fn set_active(&mut self, entity: usize, active: bool) {
            self.active.push((entity, active));
        }

        fn set_pose(&mut self, entity: usize, pose: &EntityPose) {
            self.poses.push((entity, *pose));
        }

        fn set_marker_positions(&mut self, positions: &[Point3]) {
            self.markers = positions.to_vec();
        }
    }

    fn settings() -> TrackingSettings {
        TrackingSettings::default().with_virtual_world_space(Size::new(10.0, 10.0, 10.0))
    }

    #[test]
    fn test_uncalibrated_stream_passes_through() {
        let raw = Point3::new(0.25, 1.5, -0.75);
        let mut tracking = TrackingLoop::new(MockProvider::at(&[raw]), settings(), SharedCalibration::default());
        let mut consumer = RecordingConsumer::default();

        assert_eq!(tracking.tick(&mut consumer), 1);
        let (entity, pose) = consumer.poses[0];
        assert_eq!(entity, 0);
        assert_relative_eq!(pose.position, raw, epsilon = 1e-6);
        assert!(!pose.apply_vertical);
        assert!(pose.rotation.is_some());
    }

    #[test]
    fn test_calibrated_stream_is_mapped() {
        let active = SharedCalibration::new(Calibration::new(
            Point3::new(1.0, 0.0, 1.0),
            Quat::identity(),
            Size::new(2.0, 2.0, 2.0),
        ));
        let settings = settings().with_players(2);
        let provider = MockProvider::at(&[Point3::new(2.0, 1.0, 1.0), Point3::new(1.0, 0.0, 0.0)]);
        let mut tracking = TrackingLoop::new(provider, settings, active);
        let mut consumer = RecordingConsumer::default();

        assert_eq!(tracking.tick(&mut consumer), 2);
        assert_relative_eq!(consumer.poses[0].1.position, Point3::new(5.0, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(consumer.poses[1].1.position, Point3::new(0.0, 0.0, -5.0), epsilon = 1e-6);
    }

    #[test]
    fn test_new_calibration_applies_on_next_tick() {
        let active = SharedCalibration::default();
        let raw = Point3::new(3.0, 0.0, 0.0);
        let mut tracking = TrackingLoop::new(MockProvider::at(&[raw]), settings(), active.clone());
        let mut consumer = RecordingConsumer::default();

        tracking.tick(&mut consumer);
        active.publish(Calibration::new(Point3::new(1.0, 0.0, 0.0), Quat::identity(), Size::new(10.0, 10.0, 10.0)));
        tracking.tick(&mut consumer);

        assert_relative_eq!(consumer.poses[0].1.position, raw, epsilon = 1e-6);
        assert_relative_eq!(consumer.poses[1].1.position, Point3::new(2.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_failed_poll_skips_tick_and_recovers() {
        let mut provider = MockProvider::at(&[Point3::new(1.0, 2.0, 3.0)]);
        provider.fail_next_poll = true;
        let mut tracking = TrackingLoop::new(provider, settings(), SharedCalibration::default());
        let mut consumer = RecordingConsumer::default();

        assert_eq!(tracking.tick(&mut consumer), 0);
        assert!(consumer.poses.is_empty());
        assert_eq!(tracking.last_raw_position(0), None);

        assert_eq!(tracking.tick(&mut consumer), 1);
        assert_eq!(tracking.provider().polls, 2);
        assert_eq!(tracking.tick_count(), 1);
    }

    #[test]
    fn test_rotation_gated_by_settings() {
        let mut settings = settings();
        settings.enable_rotation = false;
        settings.enable_y_axis = true;
        let mut tracking =
            TrackingLoop::new(MockProvider::at(&[Point3::origin()]), settings, SharedCalibration::default());
        let mut consumer = RecordingConsumer::default();

        tracking.tick(&mut consumer);
        let pose = consumer.poses[0].1;
        assert!(pose.rotation.is_none());
        assert!(pose.apply_vertical);
    }

    #[test]
    fn test_remap_applied_once() {
        let raw = Point3::new(1.0, 2.0, 3.0);
        let expected = Point3::new(3.0, 2.0, -1.0);
        let settings = settings().with_axis_remap(AxisRemap::INVERT_X | AxisRemap::SWAP_XZ);

        let mut core_remap =
            TrackingLoop::new(MockProvider::at(&[raw]), settings.clone(), SharedCalibration::default());
        let mut provider = MockProvider::at(&[raw]);
        provider.remaps_itself = true;
        let mut provider_remap = TrackingLoop::new(provider, settings, SharedCalibration::default());

        for tracking in [&mut core_remap, &mut provider_remap] {
            let mut consumer = RecordingConsumer::default();
            tracking.tick(&mut consumer);
            assert_relative_eq!(consumer.poses[0].1.position, expected, epsilon = 1e-6);
            assert_relative_eq!(tracking.last_raw_position(0).unwrap(), expected, epsilon = 1e-6);
        }
    }
}
