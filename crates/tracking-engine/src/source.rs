//! Collaborator interfaces and the latest-frame slot.
//!
//! The pose estimator delivers results asynchronously relative to the
//! render clock. Results are pushed into a single-slot channel; the frame
//! loop picks up whatever is newest on each iteration and never sees the
//! same result twice.

use async_trait::async_trait;
use tokio::sync::watch;

use peekaboo_common::error::PeekabooResult;
use peekaboo_pose_model::event::{PoseFrame, TriggerEvent};
use peekaboo_pose_model::landmark::ControlCoordinate;

use crate::status::SessionStatus;

/// Trait for a camera (or other video source).
///
/// Implementations wrap the platform camera stack.
#[async_trait]
pub trait CaptureDevice: Send {
    /// Acquire the device. Returns `CaptureDenied` when access is refused.
    async fn start(&mut self) -> PeekabooResult<()>;

    /// Release the device. Must be safe to call when not running.
    fn stop(&mut self);

    /// Check if the device is currently streaming.
    fn is_running(&self) -> bool;
}

/// Trait for a pose-estimation model.
///
/// Results are not returned from [`PoseEstimator::request`]; they are pushed
/// through the [`FramePublisher`] the estimator was built with, whenever
/// inference completes.
#[async_trait]
pub trait PoseEstimator: Send {
    /// Initialize the model. Returns `ModelUnavailable` on failure.
    async fn load(&mut self) -> PeekabooResult<()>;

    /// Ask for landmarks of the current video frame, keyed by `timestamp_ns`.
    fn request(&mut self, timestamp_ns: u64);

    /// Estimator name for logging.
    fn name(&self) -> &str;
}

/// Receives everything the frame loop produces.
pub trait AnimationSink: Send {
    /// New aim point for the character. Called once per processed frame.
    fn set_control(&mut self, control: ControlCoordinate);

    /// A discrete animation cue.
    fn trigger(&mut self, event: &TriggerEvent);

    /// Overlay visibility changed.
    fn ui_visibility(&mut self, _visible: bool) {}

    /// Session status changed.
    fn status(&mut self, _status: SessionStatus) {}
}

/// Producer half of the latest-frame slot.
#[derive(Debug, Clone)]
pub struct FramePublisher {
    tx: watch::Sender<Option<PoseFrame>>,
}

impl FramePublisher {
    /// Replace whatever is in the slot with `frame`.
    pub fn publish(&self, frame: PoseFrame) {
        self.tx.send_replace(Some(frame));
    }
}

/// Consumer half of the latest-frame slot.
#[derive(Debug)]
pub struct FrameSlot {
    rx: watch::Receiver<Option<PoseFrame>>,
}

impl FrameSlot {
    /// Take the newest frame if one arrived since the last call.
    pub fn take_latest(&mut self) -> Option<PoseFrame> {
        match self.rx.has_changed() {
            Ok(true) => self.rx.borrow_and_update().clone(),
            // Nothing new, or the estimator is gone.
            _ => None,
        }
    }

    /// Mark whatever is in the slot as already seen.
    pub fn discard(&mut self) {
        let _ = self.rx.borrow_and_update();
    }
}

/// Create a connected publisher/slot pair.
pub fn frame_slot() -> (FramePublisher, FrameSlot) {
    let (tx, rx) = watch::channel(None);
    (FramePublisher { tx }, FrameSlot { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use peekaboo_pose_model::landmark::{Landmark, LandmarkSet};

    fn frame(t: u64) -> PoseFrame {
        PoseFrame::new(t, LandmarkSet::new(vec![Landmark::new(0.5, 0.5, -0.1)]))
    }

    #[test]
    fn test_empty_slot_yields_nothing() {
        let (_publisher, mut slot) = frame_slot();
        assert_eq!(slot.take_latest(), None);
    }

    #[test]
    fn test_latest_wins_and_is_consumed_once() {
        let (publisher, mut slot) = frame_slot();
        publisher.publish(frame(1));
        publisher.publish(frame(2));

        assert_eq!(slot.take_latest().map(|f| f.timestamp_ns), Some(2));
        assert_eq!(slot.take_latest(), None);

        publisher.publish(frame(3));
        assert_eq!(slot.take_latest().map(|f| f.timestamp_ns), Some(3));
    }

    #[test]
    fn test_discard_drops_pending_frame() {
        let (publisher, mut slot) = frame_slot();
        publisher.publish(frame(1));
        slot.discard();
        assert_eq!(slot.take_latest(), None);
    }

    #[test]
    fn test_dropped_publisher_is_not_an_error() {
        let (publisher, mut slot) = frame_slot();
        drop(publisher);
        assert_eq!(slot.take_latest(), None);
    }
}
