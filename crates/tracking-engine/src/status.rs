//! Session status machine.
//!
//! ```text
//!  Idle ──ModelLoading──▶ LoadingModel ──ModelReady──▶ Ready ◀──CaptureStopped── Running
//!   ▲                          │                         │  └──CaptureStarted──────▲
//!   │                          │                         │
//!   └──── Error ◀──Failed──────┴─────────Failed──────────┘   (Failed is accepted anywhere)
//!           └──ModelLoading──▶ LoadingModel
//! ```
//!
//! Every status change goes through [`transition`].

use serde::{Deserialize, Serialize};

use peekaboo_common::error::{PeekabooError, PeekabooResult};

/// Caller-visible session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Nothing loaded yet.
    Idle,
    /// The pose model is initializing.
    LoadingModel,
    /// Model ready, camera not running.
    Ready,
    /// Camera running, frame loop active.
    Running,
    /// A capture or model fault occurred.
    Error,
}

/// Why a session ended up in `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionFault {
    CaptureDenied,
    ModelUnavailable,
}

/// Inputs to the status machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    ModelLoading,
    ModelReady,
    CaptureStarted,
    CaptureStopped,
    Failed {
        fault: SessionFault,
        message: String,
    },
}

impl SessionAction {
    fn name(&self) -> &'static str {
        match self {
            SessionAction::ModelLoading => "model_loading",
            SessionAction::ModelReady => "model_ready",
            SessionAction::CaptureStarted => "capture_started",
            SessionAction::CaptureStopped => "capture_stopped",
            SessionAction::Failed { .. } => "failed",
        }
    }
}

/// Compute the next status, rejecting moves the lifecycle does not allow.
pub fn transition(
    status: SessionStatus,
    action: &SessionAction,
) -> PeekabooResult<SessionStatus> {
    use SessionAction as A;
    use SessionStatus as S;

    match (status, action) {
        (S::Idle | S::Error, A::ModelLoading) => Ok(S::LoadingModel),
        (S::LoadingModel, A::ModelReady) => Ok(S::Ready),
        (S::Ready, A::CaptureStarted) => Ok(S::Running),
        (S::Running | S::Ready, A::CaptureStopped) => Ok(S::Ready),
        (_, A::Failed { .. }) => Ok(S::Error),
        (status, action) => Err(PeekabooError::session(format!(
            "cannot apply {} while {:?}",
            action.name(),
            status
        ))),
    }
}

/// Status plus the error detail shown to the operator.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    status: SessionStatus,
    fault: Option<SessionFault>,
    error: Option<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            status: SessionStatus::Idle,
            fault: None,
            error: None,
        }
    }

    /// Apply an action through [`transition`].
    ///
    /// On rejection the state is left untouched.
    pub fn apply(&mut self, action: SessionAction) -> PeekabooResult<SessionStatus> {
        let next = transition(self.status, &action)?;
        match action {
            SessionAction::Failed { fault, message } => {
                tracing::warn!(?fault, %message, "Session failed");
                self.fault = Some(fault);
                self.error = Some(message);
            }
            SessionAction::ModelLoading | SessionAction::CaptureStarted => {
                self.fault = None;
                self.error = None;
            }
            _ => {}
        }
        if next != self.status {
            tracing::info!(from = ?self.status, to = ?next, "Session status changed");
        }
        self.status = next;
        Ok(next)
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn fault(&self) -> Option<SessionFault> {
        self.fault
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn is_loading(&self) -> bool {
        self.status == SessionStatus::LoadingModel
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(fault: SessionFault) -> SessionAction {
        SessionAction::Failed {
            fault,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_happy_path() {
        let mut state = SessionState::new();
        assert_eq!(state.status(), SessionStatus::Idle);
        state.apply(SessionAction::ModelLoading).unwrap();
        assert!(state.is_loading());
        state.apply(SessionAction::ModelReady).unwrap();
        state.apply(SessionAction::CaptureStarted).unwrap();
        assert!(state.is_running());
        state.apply(SessionAction::CaptureStopped).unwrap();
        assert_eq!(state.status(), SessionStatus::Ready);
        // Restartable.
        state.apply(SessionAction::CaptureStarted).unwrap();
        assert!(state.is_running());
    }

    #[test]
    fn test_capture_requires_ready() {
        assert!(transition(SessionStatus::Idle, &SessionAction::CaptureStarted).is_err());
        assert!(transition(SessionStatus::LoadingModel, &SessionAction::CaptureStarted).is_err());
        assert!(transition(SessionStatus::Error, &SessionAction::CaptureStarted).is_err());
        assert!(transition(SessionStatus::Running, &SessionAction::CaptureStarted).is_err());
    }

    #[test]
    fn test_rejected_action_leaves_state() {
        let mut state = SessionState::new();
        let err = state.apply(SessionAction::ModelReady).unwrap_err();
        assert!(matches!(err, PeekabooError::Session { .. }));
        assert_eq!(state.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_model_failure_is_surfaced() {
        let mut state = SessionState::new();
        state.apply(SessionAction::ModelLoading).unwrap();
        state.apply(failed(SessionFault::ModelUnavailable)).unwrap();
        assert_eq!(state.status(), SessionStatus::Error);
        assert_eq!(state.fault(), Some(SessionFault::ModelUnavailable));
        assert_eq!(state.error(), Some("boom"));
    }

    #[test]
    fn test_error_is_sticky_until_reload() {
        let mut state = SessionState::new();
        state.apply(SessionAction::ModelLoading).unwrap();
        state.apply(SessionAction::ModelReady).unwrap();
        state.apply(failed(SessionFault::CaptureDenied)).unwrap();

        assert!(state.apply(SessionAction::CaptureStarted).is_err());
        assert!(state.apply(SessionAction::CaptureStopped).is_err());

        state.apply(SessionAction::ModelLoading).unwrap();
        assert_eq!(state.error(), None);
        assert_eq!(state.status(), SessionStatus::LoadingModel);
    }
}
