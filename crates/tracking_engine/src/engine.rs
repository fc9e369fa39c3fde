//! Core engine implementation

use std::sync::Arc;

use thiserror::Error;

use crate::calibration::{
    Calibration, CalibrationSession, CalibrationStore, ConsistencyValidator, RemoveOutcome, SessionError,
    SessionOutcome, SessionState, SharedCalibration, StoreError, TransformSolver,
};
use crate::core::config::TrackingConfig;
use crate::core::ConfigError;
use crate::events::{CalibrationSummary, EventSystem, StatusEvent};
use crate::foundation::math::Point3;
use crate::foundation::time::{FixedTicker, Timer};
use crate::tracking::{PoseConsumer, ProviderError, TrackingLoop, TrackingProvider};

/// Tracking engine
///
/// Owns the tracking loop, the calibration session and the persisted record,
/// and reports lifecycle changes through its [`EventSystem`].
pub struct TrackingEngine<P: TrackingProvider> {
    tracking: TrackingLoop<P>,
    session: CalibrationSession,
    store: CalibrationStore,
    active: SharedCalibration,
    events: EventSystem,
    config: TrackingConfig,
    timer: Timer,
    running: bool,
}

impl<P: TrackingProvider> TrackingEngine<P> {
    /// Create a new engine and load the persisted calibration
    ///
    /// A missing or malformed calibration record is not an error: the engine
    /// starts uncalibrated and queues a [`StatusEvent::LoadFailed`].
    pub fn new(config: TrackingConfig, provider: P) -> Result<Self, EngineError> {
        log::info!("Initializing tracking engine...");
        config.validate()?;

        let active = SharedCalibration::default();
        let settings = config.tracking.clone();
        let session = CalibrationSession::new(
            ConsistencyValidator::new(),
            TransformSolver::new(settings.virtual_world_space()),
            active.clone(),
        )
        .with_marker_settle(config.calibration.marker_settle_secs);

        let mut engine = Self {
            tracking: TrackingLoop::new(provider, settings, active.clone()),
            session,
            store: CalibrationStore::from_config(&config.calibration),
            active,
            events: EventSystem::new(),
            config,
            timer: Timer::new(),
            running: false,
        };
        engine.load_calibration();
        Ok(engine)
    }

    /// Start the provider and activate the configured entities
    ///
    /// With tracking disabled the provider is left alone and every entity is
    /// deactivated.
    pub fn start(&mut self, consumer: &mut dyn PoseConsumer) -> Result<(), EngineError> {
        let settings = self.config.tracking.clone();
        if !settings.enable_tracking {
            log::info!("Tracking disabled, provider not started");
            for entity in 0..settings.number_of_players {
                consumer.set_active(entity, false);
            }
            return Ok(());
        }

        log::info!(
            "Starting tracking with {} players and {} base stations",
            settings.number_of_players,
            settings.number_of_base_stations
        );
        self.tracking
            .provider_mut()
            .start(settings.number_of_players, settings.number_of_base_stations)?;

        let provider = self.tracking.provider();
        let checks = [
            ("trackers", settings.number_of_players, provider.detected_entities()),
            ("base stations", settings.number_of_base_stations, provider.detected_base_stations()),
        ];
        for (subject, configured, detected) in checks {
            if configured != detected {
                log::warn!("Discrepancy in {subject}: {configured} configured, {detected} detected");
                self.events.send(StatusEvent::ProviderDiscrepancy { subject, configured, detected });
            }
        }

        for entity in 0..settings.number_of_players {
            consumer.set_active(entity, true);
        }
        self.running = true;
        Ok(())
    }

    /// Advance the engine by one tick
    ///
    /// Polls and forwards poses while running, advances the marker animation
    /// and dispatches queued status events. Returns the number of poses
    /// forwarded.
    pub fn tick(&mut self, delta_time: f64, consumer: &mut dyn PoseConsumer) -> usize {
        let forwarded = if self.running { self.tracking.tick(consumer) } else { 0 };

        if let Some((positions, settled)) = self.session.tick(delta_time) {
            consumer.set_marker_positions(&positions);
            if settled {
                log::debug!("Calibration markers settled");
            }
        }

        self.events.dispatch();
        forwarded
    }

    /// Run ticks at the configured cadence while `should_continue` holds
    pub fn run(&mut self, consumer: &mut dyn PoseConsumer, mut should_continue: impl FnMut(&Self) -> bool) {
        if !self.running {
            log::info!("Tracking not running, nothing to do");
            return;
        }

        let mut ticker = FixedTicker::new(self.config.tracking.tick_interval());
        self.timer = Timer::new();
        log::info!("Starting tracking loop every {:.1} ms", ticker.interval() * 1000.0);

        while self.running && should_continue(self) {
            self.timer.update();
            for _ in 0..ticker.advance(self.timer.delta_time()) {
                self.tick(ticker.interval(), consumer);
            }
            std::thread::sleep(ticker.time_until_next());
        }

        log::info!("Tracking loop stopped after {} ticks", self.tracking.tick_count());
    }

    /// Start a calibration session
    pub fn begin_calibration(&mut self) {
        self.session.start();
        self.events.send(StatusEvent::SessionStarted);
    }

    /// Record the latest raw position of entity 0 as the next calibration point
    pub fn sample_calibration_point(&mut self) -> Result<SessionOutcome, EngineError> {
        let point = self.tracking.last_raw_position(0).ok_or(EngineError::NoSample(0))?;
        Ok(self.record_point(point)?)
    }

    /// Record the next calibration point
    ///
    /// # Errors
    /// [`SessionError::NotActive`] when no session is waiting for a point.
    pub fn record_point(&mut self, point: Point3) -> Result<SessionOutcome, SessionError> {
        let outcome = self.session.record_point(point, &self.tracking.mapper())?;
        let event = match &outcome {
            SessionOutcome::AwaitingPoint(next) => StatusEvent::StepAdvanced { step: next - 1, point },
            SessionOutcome::Calibrated(calibration) => {
                StatusEvent::CalibrationCompleted(CalibrationSummary::from(calibration))
            }
            SessionOutcome::Rejected => StatusEvent::CalibrationRejected,
        };
        self.events.send(event);
        Ok(outcome)
    }

    /// Abandon the running calibration session
    pub fn cancel_calibration(&mut self) {
        if self.session.cancel() {
            self.events.send(StatusEvent::SessionCancelled);
        }
    }

    /// Persist the active calibration
    pub fn save_calibration(&mut self) -> Result<(), StoreError> {
        match self.store.save(&self.active.snapshot()) {
            Ok(()) => {
                self.events.send(StatusEvent::CalibrationSaved);
                Ok(())
            }
            Err(e) => {
                log::warn!("Calibration not saved: {e}");
                self.events.send(StatusEvent::SaveRejected { reason: e.to_string() });
                Err(e)
            }
        }
    }

    /// Delete the persisted calibration and reset the active one
    pub fn remove_calibration(&mut self) -> Result<RemoveOutcome, StoreError> {
        match self.store.remove(&self.active) {
            Ok(outcome) => {
                self.events.send(match outcome {
                    RemoveOutcome::Removed => StatusEvent::CalibrationRemoved,
                    RemoveOutcome::NothingToRemove => StatusEvent::NothingToRemove,
                });
                Ok(outcome)
            }
            Err(e) => {
                log::warn!("Calibration file not removed, tracking is uncalibrated: {e}");
                self.events.send(StatusEvent::RemoveFailed { reason: e.to_string() });
                Err(e)
            }
        }
    }

    /// Load the persisted calibration, returns whether one was loaded
    ///
    /// On failure the active calibration is left as it was.
    pub fn load_calibration(&mut self) -> bool {
        match self.store.load() {
            Ok(calibration) => {
                log::info!("Loaded calibration centered at {:?}", calibration.center());
                self.events
                    .send(StatusEvent::CalibrationLoaded(CalibrationSummary::from(&calibration)));
                self.active.publish(calibration);
                true
            }
            Err(e) => {
                log::warn!("Tracking stays uncalibrated: {e}");
                self.events.send(StatusEvent::LoadFailed { reason: e.to_string() });
                false
            }
        }
    }

    /// Stop the provider
    pub fn shutdown(&mut self) {
        if self.running {
            self.tracking.provider_mut().stop();
            self.running = false;
            log::info!("Tracking engine shutdown complete");
        }
    }

    /// Whether the provider is started
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current calibration
    pub fn calibration(&self) -> Arc<Calibration> {
        self.active.snapshot()
    }

    /// Handle to the active calibration
    pub fn shared_calibration(&self) -> SharedCalibration {
        self.active.clone()
    }

    /// Calibration session state
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    /// Completed tracking ticks
    pub fn tick_count(&self) -> u64 {
        self.tracking.tick_count()
    }

    /// Get the calibration store
    pub fn store(&self) -> &CalibrationStore {
        &self.store
    }

    /// Get the configuration
    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Get the event system
    pub fn events(&self) -> &EventSystem {
        &self.events
    }

    /// Get mutable access to the event system
    pub fn events_mut(&mut self) -> &mut EventSystem {
        &mut self.events
    }

    /// Get the tracking loop
    pub fn tracking(&self) -> &TrackingLoop<P> {
        &self.tracking
    }

    /// Get mutable access to the tracking provider
    pub fn provider_mut(&mut self) -> &mut P {
        self.tracking.provider_mut()
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Provider failure
    #[error("Tracking provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Calibration session out of order
    #[error("Calibration session error: {0}")]
    Session(#[from] SessionError),

    /// No sample has been polled for the entity yet
    #[error("No tracking sample available for entity {0}")]
    NoSample(usize),
}
