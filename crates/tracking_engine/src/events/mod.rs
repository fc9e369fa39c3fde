//! Calibration status events
//!
//! Presentation layers register handlers for the lifecycle events they care
//! about. Events are queued while the engine works and delivered on
//! `dispatch`:
//! - Handlers registered per event kind, only interested handlers are notified
//! - A handler returns `true` to consume the event and stop forwarding

use std::collections::HashMap;

use crate::calibration::Calibration;
use crate::foundation::math::{Point3, Quat, Size};

/// Event kind identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A persisted calibration was loaded
    CalibrationLoaded,
    /// Loading failed, tracking stays uncalibrated
    LoadFailed,
    /// The calibration was written to disk
    CalibrationSaved,
    /// Saving was refused or failed
    SaveRejected,
    /// The persisted calibration was deleted
    CalibrationRemoved,
    /// There was no persisted calibration to delete
    NothingToRemove,
    /// The persisted calibration could not be deleted
    RemoveFailed,
    /// A calibration session started
    SessionStarted,
    /// A calibration point was recorded
    StepAdvanced,
    /// A session was abandoned
    SessionCancelled,
    /// A session produced a new calibration
    CalibrationCompleted,
    /// A session's points were inconsistent
    CalibrationRejected,
    /// The rig reports a different setup than configured
    ProviderDiscrepancy,
}

impl EventKind {
    /// Every event kind
    pub const ALL: [Self; 13] = [
        Self::CalibrationLoaded,
        Self::LoadFailed,
        Self::CalibrationSaved,
        Self::SaveRejected,
        Self::CalibrationRemoved,
        Self::NothingToRemove,
        Self::RemoveFailed,
        Self::SessionStarted,
        Self::StepAdvanced,
        Self::SessionCancelled,
        Self::CalibrationCompleted,
        Self::CalibrationRejected,
        Self::ProviderDiscrepancy,
    ];
}

/// Calibration values shown by presentation layers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSummary {
    /// Physical pivot
    pub center: Point3,
    /// Measured physical extent
    pub real_world_size: Size,
    /// Rotation offset of the physical base
    pub rotation_offset: Quat,
}

impl From<&Calibration> for CalibrationSummary {
    fn from(calibration: &Calibration) -> Self {
        Self {
            center: calibration.center(),
            real_world_size: calibration.real_world_size(),
            rotation_offset: calibration.rotation_offset(),
        }
    }
}

/// Lifecycle status reported by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// A persisted calibration was loaded
    CalibrationLoaded(CalibrationSummary),
    /// Loading failed, tracking stays uncalibrated
    LoadFailed {
        /// Why loading failed
        reason: String,
    },
    /// The calibration was written to disk
    CalibrationSaved,
    /// Saving was refused or failed
    SaveRejected {
        /// Why nothing was saved
        reason: String,
    },
    /// The persisted calibration was deleted
    CalibrationRemoved,
    /// There was no persisted calibration to delete
    NothingToRemove,
    /// The persisted calibration could not be deleted; tracking is
    /// uncalibrated regardless
    RemoveFailed {
        /// Why the record is still there
        reason: String,
    },
    /// A calibration session started
    SessionStarted,
    /// A calibration point was recorded
    StepAdvanced {
        /// Index of the recorded point
        step: usize,
        /// The recorded point
        point: Point3,
    },
    /// A session was abandoned
    SessionCancelled,
    /// A session produced a new calibration
    CalibrationCompleted(CalibrationSummary),
    /// A session's points were inconsistent
    CalibrationRejected,
    /// The rig reports a different setup than configured
    ProviderDiscrepancy {
        /// What was compared, e.g. "trackers"
        subject: &'static str,
        /// Configured count
        configured: usize,
        /// Detected count
        detected: usize,
    },
}

impl StatusEvent {
    /// Kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            Self::CalibrationLoaded(_) => EventKind::CalibrationLoaded,
            Self::LoadFailed { .. } => EventKind::LoadFailed,
            Self::CalibrationSaved => EventKind::CalibrationSaved,
            Self::SaveRejected { .. } => EventKind::SaveRejected,
            Self::CalibrationRemoved => EventKind::CalibrationRemoved,
            Self::NothingToRemove => EventKind::NothingToRemove,
            Self::RemoveFailed { .. } => EventKind::RemoveFailed,
            Self::SessionStarted => EventKind::SessionStarted,
            Self::StepAdvanced { .. } => EventKind::StepAdvanced,
            Self::SessionCancelled => EventKind::SessionCancelled,
            Self::CalibrationCompleted(_) => EventKind::CalibrationCompleted,
            Self::CalibrationRejected => EventKind::CalibrationRejected,
            Self::ProviderDiscrepancy { .. } => EventKind::ProviderDiscrepancy,
        }
    }

    /// Short status line for display
    pub fn status_text(&self) -> String {
        match self {
            Self::CalibrationLoaded(_) => "Loaded Calibration!".to_string(),
            Self::LoadFailed { .. } => "Calibration Failed!".to_string(),
            Self::CalibrationSaved => "Calibration Saved".to_string(),
            Self::SaveRejected { .. } => "Calibration not completed".to_string(),
            Self::CalibrationRemoved => "Calibration Removed".to_string(),
            Self::NothingToRemove => "No Calibration File Found To Remove".to_string(),
            Self::RemoveFailed { .. } => "Calibration File Could Not Be Removed".to_string(),
            Self::SessionStarted => "Tracking Step 1".to_string(),
            Self::StepAdvanced { step, .. } => format!("Tracking Step {}", step + 2),
            Self::SessionCancelled => "Calibration cancelled".to_string(),
            Self::CalibrationCompleted(_) => "Calibration completed.".to_string(),
            Self::CalibrationRejected => {
                "Calibration points are not consistent, please calibrate again.".to_string()
            }
            Self::ProviderDiscrepancy { subject, .. } => format!("Discrepancy in {subject}"),
        }
    }
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding)
pub trait EventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &StatusEvent) -> bool;
}

/// Status event queue with per-kind handler registration
#[derive(Default)]
pub struct EventSystem {
    queue: Vec<StatusEvent>,
    handlers: HashMap<EventKind, Vec<Box<dyn EventHandler>>>,
}

impl EventSystem {
    /// Create a new empty event system
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind
    pub fn register_handler(&mut self, kind: EventKind, handler: Box<dyn EventHandler>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Queue an event for the next dispatch
    pub fn send(&mut self, event: StatusEvent) {
        log::debug!("Status: {}", event.status_text());
        self.queue.push(event);
    }

    /// Number of queued events
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Events waiting for the next dispatch, oldest first
    pub fn queued(&self) -> &[StatusEvent] {
        &self.queue
    }

    /// Deliver all queued events, returns how many were delivered
    pub fn dispatch(&mut self) -> usize {
        let queued = std::mem::take(&mut self.queue);
        let count = queued.len();
        for event in &queued {
            if let Some(handlers) = self.handlers.get_mut(&event.kind()) {
                for handler in handlers.iter_mut() {
                    if handler.on_event(event) {
                        break;
                    }
                }
            }
        }
        count
    }

    /// Drop queued events without delivering them
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        received: Rc<RefCell<Vec<StatusEvent>>>,
        consume: bool,
    }

    impl EventHandler for Recorder {
        fn on_event(&mut self, event: &StatusEvent) -> bool {
            self.received.borrow_mut().push(event.clone());
            self.consume
        }
    }

    fn recorder(consume: bool) -> (Box<Recorder>, Rc<RefCell<Vec<StatusEvent>>>) {
        let received = Rc::new(RefCell::new(Vec::new()));
        (Box::new(Recorder { received: Rc::clone(&received), consume }), received)
    }

    #[test]
    fn test_only_registered_kinds_are_delivered() {
        let mut system = EventSystem::new();
        let (handler, received) = recorder(false);
        system.register_handler(EventKind::CalibrationSaved, handler);

        system.send(StatusEvent::CalibrationSaved);
        system.send(StatusEvent::NothingToRemove);
        assert_eq!(system.pending(), 2);
        assert_eq!(system.dispatch(), 2);

        assert_eq!(*received.borrow(), vec![StatusEvent::CalibrationSaved]);
        assert_eq!(system.pending(), 0);
    }

    #[test]
    fn test_event_consumption() {
        let mut system = EventSystem::new();
        let (first, first_received) = recorder(true);
        let (second, second_received) = recorder(false);
        system.register_handler(EventKind::CalibrationRejected, first);
        system.register_handler(EventKind::CalibrationRejected, second);

        system.send(StatusEvent::CalibrationRejected);
        system.dispatch();

        assert_eq!(first_received.borrow().len(), 1);
        assert!(second_received.borrow().is_empty());
    }

    #[test]
    fn test_status_text() {
        assert_eq!(StatusEvent::SessionStarted.status_text(), "Tracking Step 1");
        let step = StatusEvent::StepAdvanced { step: 0, point: Point3::origin() };
        assert_eq!(step.status_text(), "Tracking Step 2");
        assert_eq!(StatusEvent::NothingToRemove.kind(), EventKind::NothingToRemove);
    }
}
