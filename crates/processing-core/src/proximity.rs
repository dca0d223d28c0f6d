//! Proximity trigger detection.
//!
//! Edge detector over the primary landmark's depth. Crossing the threshold
//! outward (viewer approaches) fires `Primary`; crossing back fires
//! `Secondary`. Nothing fires while the state holds, while disabled, or
//! when no landmark is available, and the latch survives all three.

use serde::{Deserialize, Serialize};

use peekaboo_pose_model::event::TriggerKind;

/// Latched proximity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityState {
    #[default]
    Far,
    Close,
}

/// Two-state edge detector for "enter/leave proximity zone" cues.
#[derive(Debug, Clone, Default)]
pub struct ProximityDetector {
    state: ProximityState,
}

impl ProximityDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one smoothed depth sample.
    ///
    /// Returns the trigger to fire, if this sample is a confirmed crossing.
    pub fn evaluate(
        &mut self,
        depth: Option<f64>,
        enabled: bool,
        threshold: f64,
    ) -> Option<TriggerKind> {
        if !enabled {
            return None;
        }
        let z = depth?;
        if !z.is_finite() {
            return None;
        }

        let is_close = z.abs() > threshold;
        match (self.state, is_close) {
            (ProximityState::Far, true) => {
                self.state = ProximityState::Close;
                tracing::debug!(z, threshold, "Viewer entered proximity zone");
                Some(TriggerKind::Primary)
            }
            (ProximityState::Close, false) => {
                self.state = ProximityState::Far;
                tracing::debug!(z, threshold, "Viewer left proximity zone");
                Some(TriggerKind::Secondary)
            }
            _ => None,
        }
    }

    pub fn state(&self) -> ProximityState {
        self.state
    }

    pub fn is_close(&self) -> bool {
        self.state == ProximityState::Close
    }
}
