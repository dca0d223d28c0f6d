//! Peekaboo Tracking Engine
//!
//! Runs a tracking session: loads the pose model, opens the camera, and
//! turns the estimator's landmark stream into aim points and trigger cues
//! for the animation sink.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       StageRunner                        │
//! │  ┌──────────────┐  request(t)  ┌───────────────┐         │
//! │  │ frame timer  │─────────────▶│ PoseEstimator │         │
//! │  └──────┬───────┘              └───────┬───────┘         │
//! │         │                    publish   ▼                 │
//! │         │                      ┌──────────────┐          │
//! │         └────── take_latest ──▶│  FrameSlot   │          │
//! │                                └──────┬───────┘          │
//! │                                       ▼                  │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │ FrameLoop: timers → smoother → mapper → proximity  │  │
//! │  └────────────────────────┬───────────────────────────┘  │
//! │                           ▼                              │
//! │                    AnimationSink                         │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod coordinator;
pub mod runner;
pub mod source;
pub mod status;
pub mod synthetic;

pub use coordinator::{FrameLoop, FrameOutput, LoopState, LoopStats};
pub use runner::{StageRunner, UiCommand};
pub use source::{
    frame_slot, AnimationSink, CaptureDevice, FramePublisher, FrameSlot, PoseEstimator,
};
pub use status::{transition, SessionAction, SessionFault, SessionState, SessionStatus};
pub use synthetic::{PoseScript, ReplayEstimator, ScriptedEstimator, VirtualCamera};
