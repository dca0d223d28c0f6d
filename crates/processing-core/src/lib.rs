//! Peekaboo Processing Core
//!
//! Turns noisy pose landmarks into animation input:
//! - **Smoothing:** Per-coordinate exponential moving average
//! - **Calibration:** Mirrored, offset, scaled mapping into control space
//! - **Proximity:** Edge-triggered enter/leave cues from depth
//! - **Timed triggers:** Self-rescheduling fixed or random cadence
//! - **Idle tracking:** Overlay visibility during presentation
//!
//! This crate is pure computation with no I/O. Time is always passed in
//! explicitly as nanoseconds on the session clock.

pub mod calibration;
pub mod idle;
pub mod proximity;
pub mod smoother;
pub mod timed_trigger;

pub use calibration::CalibrationMapper;
pub use idle::ActivityTracker;
pub use proximity::{ProximityDetector, ProximityState};
pub use smoother::LandmarkSmoother;
pub use timed_trigger::{SchedulerState, TimedTriggerScheduler};
