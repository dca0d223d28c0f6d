//! Landmark smoothing.
//!
//! Applies an exponential moving average to every coordinate of every
//! landmark, frame over frame. The first frame is taken verbatim as the
//! baseline, and a change in landmark count re-baselines instead of
//! blending mismatched indices.

use peekaboo_pose_model::landmark::LandmarkSet;

/// Weight given to the newest sample. Lower = smoother but laggier.
pub const DEFAULT_ALPHA: f64 = 0.3;

/// Smooth one raw frame against the previous smoothed frame.
///
/// - `previous == None`: the raw frame is returned unchanged (baseline).
/// - Empty `raw`: no-op, `previous` is returned as-is.
/// - Length mismatch: the raw frame becomes the new baseline.
pub fn smooth(
    raw: &LandmarkSet,
    previous: Option<&LandmarkSet>,
    alpha: f64,
) -> Option<LandmarkSet> {
    if raw.is_empty() {
        return previous.cloned();
    }

    match previous {
        Some(prev) if prev.len() == raw.len() => Some(
            raw.iter()
                .zip(prev.iter())
                .map(|(current, last)| current.blend(last, alpha))
                .collect(),
        ),
        _ => Some(raw.clone()),
    }
}

/// Stateful EMA smoother holding the current smoothed frame.
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    alpha: f64,
    state: Option<LandmarkSet>,
}

impl LandmarkSmoother {
    /// Create a smoother with the given weight, clamped to (0, 1].
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(f64::EPSILON, 1.0),
            state: None,
        }
    }

    /// Feed one raw frame and return the updated smoothed frame.
    ///
    /// Returns `None` only when no non-empty frame has been seen yet.
    pub fn update(&mut self, raw: &LandmarkSet) -> Option<&LandmarkSet> {
        if let Some(prev) = &self.state {
            if !raw.is_empty() && prev.len() != raw.len() {
                tracing::debug!(
                    previous = prev.len(),
                    current = raw.len(),
                    "Landmark count changed; re-baselining smoother"
                );
            }
        }
        self.state = smooth(raw, self.state.as_ref(), self.alpha);
        self.state.as_ref()
    }

    /// Current smoothed frame, if any.
    pub fn current(&self) -> Option<&LandmarkSet> {
        self.state.as_ref()
    }

    /// Forget the baseline; the next frame is copied through.
    pub fn reset(&mut self) {
        self.state = None;
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Default for LandmarkSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}
