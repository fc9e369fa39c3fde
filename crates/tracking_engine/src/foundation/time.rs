//! Time management utilities

use std::time::{Duration, Instant};

use super::math::{utils, Lerp};

/// High-precision timer for tick timing
pub struct Timer {
    last_tick: Instant,
    delta_time: f64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_tick: Instant::now(),
            delta_time: 0.0,
        }
    }

    /// Update the timer (should be called once per loop iteration)
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;
    }

    /// Get the time since the last update in seconds
    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }
}

/// Fixed-cadence tick accumulator
///
/// Accumulates elapsed time and reports how many whole tick intervals are due.
/// Ticks never overlap: the caller runs each due tick to completion before
/// asking again.
#[derive(Debug, Clone)]
pub struct FixedTicker {
    interval: f64,
    accumulator: f64,
}

impl FixedTicker {
    /// Upper bound of ticks reported by a single `advance`, so a long stall
    /// does not turn into a burst of catch-up polls
    pub const MAX_CATCH_UP: u32 = 5;

    /// Create a ticker firing every `interval`
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.as_secs_f64(),
            accumulator: 0.0,
        }
    }

    /// Tick interval in seconds
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Feed elapsed time, returns the number of ticks that are due
    pub fn advance(&mut self, delta_time: f64) -> u32 {
        if self.interval <= 0.0 {
            return 0;
        }
        self.accumulator += delta_time.max(0.0);
        let mut due = 0;
        while self.accumulator >= self.interval {
            self.accumulator -= self.interval;
            due += 1;
            if due == Self::MAX_CATCH_UP {
                self.accumulator = 0.0;
                break;
            }
        }
        due
    }

    /// Time left until the next tick is due
    pub fn time_until_next(&self) -> Duration {
        Duration::from_secs_f64((self.interval - self.accumulator).max(0.0))
    }
}

/// Explicit interpolation state
///
/// Replaces per-frame animation coroutines: the owner calls `tick` with the
/// elapsed time and receives the current value and whether the tween is done.
#[derive(Debug, Clone, PartialEq)]
pub struct Tween<T: Lerp> {
    start: T,
    target: T,
    elapsed: f64,
    duration: f64,
}

impl<T: Lerp> Tween<T> {
    /// Create a tween from `start` to `target` lasting `duration` seconds
    pub fn new(start: T, target: T, duration: f64) -> Self {
        Self {
            start,
            target,
            elapsed: 0.0,
            duration: duration.max(0.0),
        }
    }

    /// Advance by `delta_time` seconds
    pub fn tick(&mut self, delta_time: f64) -> (T, bool) {
        self.elapsed = (self.elapsed + delta_time.max(0.0)).min(self.duration);
        (self.value(), self.is_complete())
    }

    /// Current interpolated value
    pub fn value(&self) -> T {
        if self.duration <= 0.0 {
            return self.target;
        }
        let t = utils::clamp(self.elapsed / self.duration, 0.0, 1.0);
        self.start.lerp_to(&self.target, t)
    }

    /// Whether the target has been reached
    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use approx::assert_relative_eq;

    #[test]
    fn test_fixed_ticker_accumulates() {
        let mut ticker = FixedTicker::new(Duration::from_millis(10));
        assert_eq!(ticker.advance(0.004), 0);
        assert_eq!(ticker.advance(0.004), 0);
        assert_eq!(ticker.advance(0.004), 1);
        assert_eq!(ticker.advance(0.025), 2);
    }

    #[test]
    fn test_fixed_ticker_caps_catch_up() {
        let mut ticker = FixedTicker::new(Duration::from_millis(10));
        assert_eq!(ticker.advance(10.0), FixedTicker::MAX_CATCH_UP);
        assert_eq!(ticker.advance(0.0), 0);
    }

    #[test]
    fn test_tween_reaches_target() {
        let mut tween = Tween::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0), 1.0);

        let (value, done) = tween.tick(0.25);
        assert_relative_eq!(value, Point3::new(2.5, 0.0, 0.0));
        assert!(!done);

        let (value, done) = tween.tick(5.0);
        assert_relative_eq!(value, Point3::new(10.0, 0.0, 0.0));
        assert!(done);
    }

    #[test]
    fn test_zero_duration_tween_is_immediately_complete() {
        let target = Point3::new(3.0, -1.0, 2.0);
        let mut tween = Tween::new(Point3::origin(), target, 0.0);
        assert_eq!(tween.tick(0.0), (target, true));
    }
}
