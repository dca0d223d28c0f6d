//! Synthetic camera and estimators.
//!
//! These stand in for the platform camera and the neural pose model so the
//! pipeline can run headless: from a scripted motion pattern, or from a
//! recorded JSONL landmark stream.

use std::path::PathBuf;

use async_trait::async_trait;

use peekaboo_common::error::{PeekabooError, PeekabooResult};
use peekaboo_pose_model::event::{parse_frames, PoseFrame};
use peekaboo_pose_model::landmark::{Landmark, LandmarkSet};

use crate::source::{CaptureDevice, FramePublisher, PoseEstimator};

/// Landmarks per scripted frame (full-body pose topology).
pub const SCRIPTED_LANDMARK_COUNT: usize = 33;

/// A camera that either grants or refuses access.
#[derive(Debug, Clone)]
pub struct VirtualCamera {
    granted: bool,
    running: bool,
}

impl VirtualCamera {
    pub fn granted() -> Self {
        Self {
            granted: true,
            running: false,
        }
    }

    pub fn denied() -> Self {
        Self {
            granted: false,
            running: false,
        }
    }
}

#[async_trait]
impl CaptureDevice for VirtualCamera {
    async fn start(&mut self) -> PeekabooResult<()> {
        if !self.granted {
            return Err(PeekabooError::capture_denied("Webcam access was denied."));
        }
        self.running = true;
        tracing::info!("Virtual camera started");
        Ok(())
    }

    fn stop(&mut self) {
        if self.running {
            tracing::info!("Virtual camera stopped");
        }
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

/// Motion pattern for [`ScriptedEstimator`].
#[derive(Debug, Clone, PartialEq)]
pub struct PoseScript {
    /// Frames spent at each depth before switching.
    pub half_period_frames: u64,
    /// Primary depth while far from the camera.
    pub far_depth: f64,
    /// Primary depth while close to the camera.
    pub near_depth: f64,
    /// Amplitude of lateral sway in normalized units.
    pub sway: f64,
    /// Drop every Nth result (simulates frames where no pose was found).
    pub drop_every: Option<u64>,
}

impl Default for PoseScript {
    fn default() -> Self {
        Self {
            half_period_frames: 180,
            far_depth: -0.1,
            near_depth: -0.9,
            sway: 0.15,
            drop_every: None,
        }
    }
}

impl PoseScript {
    /// Primary landmark for request number `n`.
    pub fn primary_at(&self, n: u64) -> Landmark {
        let phase = n as f64;
        let half = self.half_period_frames.max(1);
        let z = if (n / half) % 2 == 0 {
            self.far_depth
        } else {
            self.near_depth
        };
        Landmark::new(
            0.5 + self.sway * (phase * 0.05).sin(),
            0.5 + self.sway * 0.5 * (phase * 0.031).cos(),
            z,
        )
    }

    /// Whether request number `n` produces no result.
    pub fn drops(&self, n: u64) -> bool {
        match self.drop_every {
            Some(k) if k > 0 => n % k == k - 1,
            _ => false,
        }
    }

    /// Full landmark set for request number `n`.
    pub fn frame_at(&self, n: u64) -> LandmarkSet {
        let primary = self.primary_at(n);
        (0..SCRIPTED_LANDMARK_COUNT)
            .map(|i| {
                let offset = i as f64 * 0.01;
                Landmark::new(primary.x + offset, primary.y + offset, primary.z)
            })
            .collect()
    }
}

/// Produces landmarks from a [`PoseScript`].
#[derive(Debug)]
pub struct ScriptedEstimator {
    publisher: FramePublisher,
    script: PoseScript,
    fail_load: bool,
    loaded: bool,
    requests: u64,
}

impl ScriptedEstimator {
    pub fn new(publisher: FramePublisher, script: PoseScript) -> Self {
        Self {
            publisher,
            script,
            fail_load: false,
            loaded: false,
            requests: 0,
        }
    }

    /// Make [`PoseEstimator::load`] fail.
    pub fn failing(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }
}

#[async_trait]
impl PoseEstimator for ScriptedEstimator {
    async fn load(&mut self) -> PeekabooResult<()> {
        if self.fail_load {
            return Err(PeekabooError::model_unavailable(
                "Failed to load the AI model.",
            ));
        }
        self.loaded = true;
        Ok(())
    }

    fn request(&mut self, timestamp_ns: u64) {
        if !self.loaded {
            return;
        }
        let n = self.requests;
        self.requests += 1;
        if self.script.drops(n) {
            return;
        }
        self.publisher
            .publish(PoseFrame::new(timestamp_ns, self.script.frame_at(n)));
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Replays a recorded landmark stream (one JSON frame per line).
///
/// Recorded timestamps are replaced with the request timestamp so the
/// stream plays back at the loop's pace.
#[derive(Debug)]
pub struct ReplayEstimator {
    publisher: FramePublisher,
    path: PathBuf,
    frames: Vec<PoseFrame>,
    cursor: usize,
    looping: bool,
}

impl ReplayEstimator {
    pub fn new(publisher: FramePublisher, path: impl Into<PathBuf>) -> Self {
        Self {
            publisher,
            path: path.into(),
            frames: Vec::new(),
            cursor: 0,
            looping: false,
        }
    }

    /// Restart from the first frame when the recording runs out.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_exhausted(&self) -> bool {
        !self.looping && self.cursor >= self.frames.len()
    }
}

#[async_trait]
impl PoseEstimator for ReplayEstimator {
    async fn load(&mut self) -> PeekabooResult<()> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            PeekabooError::model_unavailable(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))
        })?;
        self.frames = parse_frames(&text)
            .map_err(|e| PeekabooError::model_unavailable(e.to_string()))?;
        self.cursor = 0;
        tracing::info!(
            path = %self.path.display(),
            frames = self.frames.len(),
            "Loaded landmark recording"
        );
        Ok(())
    }

    fn request(&mut self, timestamp_ns: u64) {
        if self.frames.is_empty() {
            return;
        }
        if self.cursor >= self.frames.len() {
            if !self.looping {
                return;
            }
            self.cursor = 0;
        }
        let recorded = &self.frames[self.cursor];
        self.cursor += 1;
        self.publisher
            .publish(PoseFrame::new(timestamp_ns, recorded.landmarks.clone()));
    }

    fn name(&self) -> &str {
        "replay"
    }
}
