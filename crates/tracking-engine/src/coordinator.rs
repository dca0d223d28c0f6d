//! Frame loop coordination.
//!
//! [`FrameLoop`] owns every piece of per-session state (raw and smoothed
//! landmarks, the proximity latch, the timed scheduler, idle tracking) and
//! sequences them once per rendered frame. It is synchronous and clock-free:
//! callers pass `now_ns` and a frame, and get back what to publish.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use peekaboo_common::config::{validate_threshold, AppConfig, CalibrationConfig, TriggerInterval};
use peekaboo_common::error::PeekabooResult;
use peekaboo_pose_model::event::{PoseFrame, TriggerEvent, TriggerKind, TriggerSource};
use peekaboo_pose_model::landmark::{ControlCoordinate, Landmark, LandmarkSet};
use peekaboo_processing_core::calibration::CalibrationMapper;
use peekaboo_processing_core::idle::ActivityTracker;
use peekaboo_processing_core::proximity::{ProximityDetector, ProximityState};
use peekaboo_processing_core::smoother::LandmarkSmoother;
use peekaboo_processing_core::timed_trigger::{SchedulerState, TimedTriggerScheduler};

use crate::status::{SessionAction, SessionFault, SessionState, SessionStatus};

/// Whether the loop is currently consuming frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// Everything one iteration wants published, in occurrence order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    /// New aim point, when a frame was processed in follow mode.
    pub control: Option<ControlCoordinate>,
    /// Trigger events, oldest first.
    pub events: Vec<TriggerEvent>,
    /// New overlay visibility, if it changed.
    pub ui_visible: Option<bool>,
    /// Whether a landmark frame went through the smoother.
    pub processed_frame: bool,
}

impl FrameOutput {
    pub fn is_empty(&self) -> bool {
        self.control.is_none() && self.events.is_empty() && self.ui_visible.is_none()
    }

    /// Kinds fired this iteration, oldest first.
    pub fn kinds(&self) -> Vec<TriggerKind> {
        self.events.iter().map(|e| e.kind).collect()
    }
}

/// Frame counters for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Frames that went through the smoother.
    pub frames_processed: u64,
    /// Iterations that had no new landmarks (or were paused).
    pub frames_skipped: u64,
    /// Trigger events emitted, from any source.
    pub triggers_fired: u64,
}

/// Operator-adjustable settings the loop reads every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
struct StageSettings {
    follow_enabled: bool,
    proximity_enabled: bool,
    proximity_threshold: f64,
}

/// Drives smoothing, mapping and triggering for one stage.
#[derive(Debug)]
pub struct FrameLoop<R: Rng = StdRng> {
    session: SessionState,
    paused: bool,
    settings: StageSettings,
    smoother: LandmarkSmoother,
    mapper: CalibrationMapper,
    proximity: ProximityDetector,
    scheduler: TimedTriggerScheduler<R>,
    activity: ActivityTracker,
    raw: Option<LandmarkSet>,
    control: Option<ControlCoordinate>,
    stats: LoopStats,
}

impl FrameLoop<StdRng> {
    /// Create a loop from configuration, seeding random intervals from OS entropy.
    pub fn new(config: &AppConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> FrameLoop<R> {
    /// Create a loop drawing random trigger intervals from `rng`.
    pub fn with_rng(config: &AppConfig, rng: R) -> Self {
        let mut scheduler = TimedTriggerScheduler::with_rng(rng);
        scheduler.set_interval(config.triggers.interval, 0);

        let mut activity = ActivityTracker::new();
        if config.presentation.start_in_presentation {
            activity.set_presentation(true, 0);
        }

        Self {
            session: SessionState::new(),
            paused: false,
            settings: StageSettings {
                follow_enabled: config.tracking.follow_enabled,
                proximity_enabled: config.triggers.proximity_enabled,
                proximity_threshold: config.triggers.proximity_threshold,
            },
            smoother: LandmarkSmoother::default(),
            mapper: CalibrationMapper::new(config.calibration),
            proximity: ProximityDetector::new(),
            scheduler,
            activity,
            raw: None,
            control: None,
            stats: LoopStats::default(),
        }
    }

    // Session lifecycle

    /// The pose model started initializing.
    pub fn begin_model_load(&mut self) -> PeekabooResult<SessionStatus> {
        self.session.apply(SessionAction::ModelLoading)
    }

    /// The pose model finished initializing.
    pub fn model_ready(&mut self) -> PeekabooResult<SessionStatus> {
        self.session.apply(SessionAction::ModelReady)
    }

    /// The pose model failed to initialize. Processing never starts.
    pub fn model_failed(&mut self, now_ns: u64, message: impl Into<String>) -> SessionStatus {
        self.fail(now_ns, SessionFault::ModelUnavailable, message.into())
    }

    /// The camera refused access. No automatic retry.
    pub fn capture_denied(&mut self, now_ns: u64, message: impl Into<String>) -> SessionStatus {
        self.fail(now_ns, SessionFault::CaptureDenied, message.into())
    }

    /// The camera is streaming; start consuming frames and arm timers.
    pub fn capture_started(&mut self, now_ns: u64) -> PeekabooResult<SessionStatus> {
        let status = self.session.apply(SessionAction::CaptureStarted)?;
        self.scheduler.set_session_active(true, now_ns);
        Ok(status)
    }

    /// End the session. Safe to call in any status.
    ///
    /// Cancels the timed trigger and drops landmark state so nothing stale
    /// reaches the next session. The proximity latch is kept.
    pub fn stop(&mut self, now_ns: u64) -> PeekabooResult<SessionStatus> {
        if self.session.is_running() {
            self.session.apply(SessionAction::CaptureStopped)?;
        }
        self.end_session(now_ns);
        Ok(self.session.status())
    }

    // Frame processing

    /// Whether the estimator should be asked for a result this iteration.
    pub fn wants_estimate(&self) -> bool {
        self.session.is_running() && !self.paused
    }

    /// Run one iteration.
    ///
    /// Timers are serviced first, then the frame (if any) goes through
    /// smoother, mapper and proximity detector in that order.
    pub fn tick(&mut self, now_ns: u64, frame: Option<PoseFrame>) -> FrameOutput {
        let mut out = self.poll_timers(now_ns);

        if !self.session.is_running() {
            return out;
        }

        match frame {
            Some(frame) if !self.paused && !frame.landmarks.is_empty() => {
                self.process(now_ns, frame.landmarks, &mut out);
            }
            _ => {
                self.stats.frames_skipped += 1;
                tracing::trace!(paused = self.paused, "No landmarks this frame");
            }
        }
        out
    }

    /// Service the timed trigger and idle timer without touching frames.
    pub fn poll_timers(&mut self, now_ns: u64) -> FrameOutput {
        let mut out = FrameOutput::default();
        if let Some(kind) = self.scheduler.poll(now_ns) {
            self.emit(&mut out, TriggerEvent::new(now_ns, kind, TriggerSource::Timed));
        }
        out.ui_visible = self.activity.poll(now_ns);
        out
    }

    fn process(&mut self, now_ns: u64, raw: LandmarkSet, out: &mut FrameOutput) {
        let smoothed_primary = self.smoother.update(&raw).and_then(|s| s.primary()).copied();
        self.raw = Some(raw);
        self.stats.frames_processed += 1;
        out.processed_frame = true;

        let Some(primary) = smoothed_primary else {
            return;
        };

        if self.settings.follow_enabled {
            let control = self.mapper.map(&primary);
            self.control = Some(control);
            out.control = Some(control);
        }

        if let Some(kind) = self.proximity.evaluate(
            Some(primary.z),
            self.settings.proximity_enabled,
            self.settings.proximity_threshold,
        ) {
            self.emit(out, TriggerEvent::new(now_ns, kind, TriggerSource::Proximity));
        }
    }

    // Operator controls

    /// Fire the primary action now, regardless of session state.
    pub fn fire_manual(&mut self, now_ns: u64) -> TriggerEvent {
        let event = TriggerEvent::primary(now_ns, TriggerSource::Manual);
        self.stats.triggers_fired += 1;
        tracing::debug!("Manual trigger fired");
        event
    }

    pub fn set_interval(&mut self, interval: TriggerInterval, now_ns: u64) {
        self.scheduler.set_interval(interval, now_ns);
    }

    /// Arm/disarm proximity triggers. Disabling keeps the latch.
    pub fn set_proximity(&mut self, enabled: bool, threshold: f64) -> PeekabooResult<()> {
        validate_threshold(threshold)?;
        self.settings.proximity_enabled = enabled;
        self.settings.proximity_threshold = threshold;
        Ok(())
    }

    pub fn set_calibration(&mut self, calibration: CalibrationConfig) -> PeekabooResult<()> {
        calibration.validate()?;
        self.mapper.set_calibration(calibration);
        Ok(())
    }

    /// Toggle follow mode (the calibration mapper).
    pub fn set_follow(&mut self, enabled: bool) {
        self.settings.follow_enabled = enabled;
    }

    /// While paused the loop stays alive but skips estimation and smoothing.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Enter or leave full-screen presentation. Returns changed visibility.
    pub fn set_presentation(&mut self, presentation: bool, now_ns: u64) -> Option<bool> {
        self.activity.set_presentation(presentation, now_ns)
    }

    /// Pointer/touch activity. Returns changed visibility.
    pub fn record_activity(&mut self, now_ns: u64) -> Option<bool> {
        self.activity.record_activity(now_ns)
    }

    // Readouts

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn loop_state(&self) -> LoopState {
        if self.session.is_running() {
            LoopState::Running
        } else {
            LoopState::Idle
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn ui_visible(&self) -> bool {
        self.activity.ui_visible()
    }

    /// Last published aim point.
    pub fn control(&self) -> Option<ControlCoordinate> {
        self.control
    }

    /// Latest raw primary landmark (debug readout).
    pub fn raw_primary(&self) -> Option<Landmark> {
        self.raw.as_ref().and_then(|r| r.primary()).copied()
    }

    /// Latest smoothed primary landmark (debug readout).
    pub fn smoothed_primary(&self) -> Option<Landmark> {
        self.smoother.current().and_then(|s| s.primary()).copied()
    }

    pub fn proximity_state(&self) -> ProximityState {
        self.proximity.state()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn interval(&self) -> TriggerInterval {
        self.scheduler.interval()
    }

    /// Earliest pending timer deadline (timed trigger or idle timeout).
    pub fn next_deadline_ns(&self) -> Option<u64> {
        match (
            self.scheduler.next_deadline_ns(),
            self.activity.next_deadline_ns(),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    fn emit(&mut self, out: &mut FrameOutput, event: TriggerEvent) {
        self.stats.triggers_fired += 1;
        tracing::debug!(kind = ?event.kind, source = ?event.source, "Trigger");
        out.events.push(event);
    }

    fn fail(&mut self, now_ns: u64, fault: SessionFault, message: String) -> SessionStatus {
        let was_running = self.session.is_running();
        // Failed is accepted from every status.
        let status = self
            .session
            .apply(SessionAction::Failed { fault, message })
            .unwrap_or(SessionStatus::Error);
        if was_running {
            self.end_session(now_ns);
        }
        status
    }

    fn end_session(&mut self, now_ns: u64) {
        self.scheduler.set_session_active(false, now_ns);
        self.smoother.reset();
        self.raw = None;
    }
}
