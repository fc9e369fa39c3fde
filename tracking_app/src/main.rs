//! Tracking demo application
//!
//! Drives the tracking engine with a simulated rig: loads the persisted
//! calibration or walks the tracker through a calibration session, saves it,
//! then tracks the tracker around a circle and logs the mapped poses.
//!
//! Usage: `tracking_demo [config.toml|config.ron]`

mod scene;
mod simulated;

use thiserror::Error;
use tracking_engine::calibration::StoreError;
use tracking_engine::core::ConfigError;
use tracking_engine::foundation::logging;
use tracking_engine::prelude::*;

use scene::{LoggingScene, StatusLogger};
use simulated::{RigLayout, SimulatedProvider};

/// Ticks the tracker is held still before each calibration sample
const SETTLE_TICKS: usize = 20;
/// Ticks of free tracking after calibration
const DEMO_TICKS: u64 = 500;

#[derive(Error, Debug)]
enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Calibration storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Calibration points were rejected")]
    CalibrationRejected,
}

fn calibrate(
    engine: &mut TrackingEngine<SimulatedProvider>,
    scene: &mut LoggingScene,
    delta_time: f64,
) -> Result<(), AppError> {
    let points = engine.tracking().provider().rig().calibration_points(2.0, 1.5, 1.8);

    engine.begin_calibration();
    for point in points {
        engine.provider_mut().hold(point);
        for _ in 0..SETTLE_TICKS {
            engine.tick(delta_time, scene);
        }
        if let SessionOutcome::Rejected = engine.sample_calibration_point()? {
            return Err(AppError::CalibrationRejected);
        }
    }

    // Let the markers settle before tracking resumes
    let settle_ticks = (engine.config().calibration.marker_settle_secs / delta_time).ceil() as usize;
    for _ in 0..=settle_ticks {
        engine.tick(delta_time, scene);
    }
    Ok(())
}

fn run(config: TrackingConfig) -> Result<(), AppError> {
    let rig = RigLayout::new(0.5, Vec3::new(3.0, 0.1, -1.0));
    let provider = SimulatedProvider::new(
        rig,
        config.tracking.number_of_players,
        config.tracking.number_of_base_stations,
        0.002,
    );
    let delta_time = config.tracking.tick_interval().as_secs_f64();

    let mut engine = TrackingEngine::new(config, provider)?;
    for kind in EventKind::ALL {
        engine.events_mut().register_handler(kind, Box::new(StatusLogger));
    }

    let mut scene = LoggingScene::default();
    engine.start(&mut scene)?;
    if !engine.is_running() {
        log::info!("Tracking is disabled in the configuration, nothing to demonstrate");
        return Ok(());
    }

    if !engine.calibration().is_valid() {
        log::info!("No stored calibration, running a calibration session");
        calibrate(&mut engine, &mut scene, delta_time)?;
        engine.save_calibration()?;
    }

    engine.provider_mut().orbit(Point3::origin(), 0.6, 0.02);
    let target = engine.tick_count() + DEMO_TICKS;
    engine.run(&mut scene, |engine| engine.tick_count() < target);

    if let Some(p) = scene.position(0) {
        log::info!("Final position of entity 0: ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z);
    }
    engine.shutdown();
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "tracking.toml".to_string());
    let config = TrackingConfig::load_or_default(&config_path)?;
    logging::init(&config.log_level);

    log::info!("Starting tracking demo");
    match run(config) {
        Ok(()) => {
            log::info!("Tracking demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Tracking demo failed: {e}");
            Err(e.into())
        }
    }
}
