//! Peekaboo Pose Model
//!
//! Defines the data contracts that flow through the tracking pipeline:
//! - **Landmarks:** Per-frame body points from the pose estimator
//! - **Control coordinates:** Where the animated character should aim
//! - **Trigger events:** Discrete "primary"/"secondary" animation cues
//!
//! Landmark x/y values are normalized image-space fractions; z is a small
//! relative depth where more negative means closer to the camera.

pub mod event;
pub mod landmark;

pub use event::*;
pub use landmark::*;
