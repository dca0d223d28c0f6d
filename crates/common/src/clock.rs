//! Clock and timing utilities.
//!
//! Every time-dependent component in Peekaboo takes an explicit
//! `now_ns` argument measured on a single monotonic clock. This module
//! provides that clock plus a few conversions:
//! - Capturing the epoch
//! - Converting between milliseconds and nanoseconds
//! - Rate limiting periodic work (e.g. status logging)

use std::time::Instant;

/// A session clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment the stage was opened).
#[derive(Debug, Clone)]
pub struct SessionClock {
    /// The instant the clock started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl SessionClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Nanoseconds elapsed since the epoch.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Seconds elapsed since the epoch.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at the epoch.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

/// Convert milliseconds to nanoseconds.
pub const fn ms_to_ns(ms: u64) -> u64 {
    ms * 1_000_000
}

/// Convert nanoseconds to (truncated) milliseconds.
pub const fn ns_to_ms(ns: u64) -> u64 {
    ns / 1_000_000
}

/// Rate limiter for periodic work on the frame loop.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_elapsed() {
        let clock = SessionClock::start();
        assert!(clock.elapsed_ns() < 1_000_000_000);
        assert!(!clock.epoch_wall().is_empty());
    }

    #[test]
    fn test_unit_conversions() {
        assert_eq!(ms_to_ns(3000), 3_000_000_000);
        assert_eq!(ns_to_ms(1_999_999), 1);
    }

    #[test]
    fn test_rate_controller() {
        let mut ctrl = RateController::new(1);
        assert!(ctrl.should_tick(0));
        assert!(!ctrl.should_tick(500_000_000));
        assert!(ctrl.should_tick(1_000_000_000));
        assert_eq!(ctrl.interval_ns(), 1_000_000_000);
    }

    #[test]
    fn test_rate_controller_zero_hz_does_not_panic() {
        let mut ctrl = RateController::new(0);
        assert!(ctrl.should_tick(0));
    }
}
