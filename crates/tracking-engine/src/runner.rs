//! Async host for a [`FrameLoop`].
//!
//! [`StageRunner`] owns the camera, the estimator and the animation sink,
//! and drives the frame loop from a tokio timer at the configured frame
//! rate. Operator input arrives as [`UiCommand`]s on an mpsc channel.
//! Timer deadlines (timed trigger, idle timeout) are honoured even between
//! frames.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use peekaboo_common::clock::RateController;
use peekaboo_common::config::{CalibrationConfig, TriggerInterval};
use peekaboo_common::error::{PeekabooError, PeekabooResult};

use crate::coordinator::{FrameLoop, FrameOutput, LoopStats};
use crate::source::{AnimationSink, CaptureDevice, FrameSlot, PoseEstimator};
use crate::status::SessionStatus;

/// How often loop statistics are logged.
const STATS_LOG_HZ: u32 = 1;

/// Operator input delivered to a running stage.
#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    /// Pointer or touch activity.
    Activity,
    SetPresentation(bool),
    SetInterval(TriggerInterval),
    SetProximity { enabled: bool, threshold: f64 },
    SetCalibration(CalibrationConfig),
    SetFollow(bool),
    SetPaused(bool),
    ManualTrigger,
    /// End the session and return from [`StageRunner::run`].
    Stop,
}

/// Runs one stage: camera, estimator, frame loop and sink.
pub struct StageRunner<S: AnimationSink, R: Rng = StdRng> {
    frame_loop: FrameLoop<R>,
    camera: Box<dyn CaptureDevice>,
    estimator: Box<dyn PoseEstimator>,
    slot: FrameSlot,
    sink: S,
    epoch: Instant,
    frame_period: Duration,
    stats_log: RateController,
}

impl<S: AnimationSink, R: Rng> StageRunner<S, R> {
    pub fn new(
        frame_loop: FrameLoop<R>,
        camera: Box<dyn CaptureDevice>,
        estimator: Box<dyn PoseEstimator>,
        slot: FrameSlot,
        sink: S,
        frame_rate_hz: u32,
    ) -> Self {
        Self {
            frame_loop,
            camera,
            estimator,
            slot,
            sink,
            epoch: Instant::now(),
            frame_period: Duration::from_nanos(1_000_000_000 / frame_rate_hz.max(1) as u64),
            stats_log: RateController::new(STATS_LOG_HZ),
        }
    }

    /// Nanoseconds since the runner was created.
    pub fn now_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Initialize the estimator, moving the session to `Ready` or `Error`.
    pub async fn load_model(&mut self) -> PeekabooResult<()> {
        self.frame_loop.begin_model_load()?;
        self.sink.status(self.frame_loop.status());

        tracing::info!(estimator = self.estimator.name(), "Loading pose model");
        match self.estimator.load().await {
            Ok(()) => {
                self.frame_loop.model_ready()?;
                self.sink.status(self.frame_loop.status());
                Ok(())
            }
            Err(e) => {
                let status = self.frame_loop.model_failed(self.now_ns(), e.to_string());
                self.sink.status(status);
                Err(e)
            }
        }
    }

    /// Acquire the camera and start consuming frames.
    pub async fn start_capture(&mut self) -> PeekabooResult<()> {
        if self.frame_loop.status() != SessionStatus::Ready {
            return Err(PeekabooError::session(format!(
                "cannot start capture while {:?}",
                self.frame_loop.status()
            )));
        }

        match self.camera.start().await {
            Ok(()) => {
                // Nothing produced before the session started counts.
                self.slot.discard();
                let status = self.frame_loop.capture_started(self.now_ns())?;
                self.sink.status(status);
                Ok(())
            }
            Err(e) => {
                let status = self.frame_loop.capture_denied(self.now_ns(), e.to_string());
                self.sink.status(status);
                Err(e)
            }
        }
    }

    /// Release the camera and end the session. Safe to call repeatedly.
    pub fn stop_capture(&mut self) -> PeekabooResult<()> {
        let was = self.frame_loop.status();
        self.camera.stop();
        self.slot.discard();
        let status = self.frame_loop.stop(self.now_ns())?;
        if status != was {
            self.sink.status(status);
        }
        Ok(())
    }

    /// Drive the stage until [`UiCommand::Stop`] arrives or every command
    /// sender is dropped. Capture is stopped before returning.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<UiCommand>,
    ) -> PeekabooResult<LoopStats> {
        let mut frames = tokio::time::interval(self.frame_period);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            status = ?self.frame_loop.status(),
            frame_period_ms = self.frame_period.as_millis() as u64,
            "Frame loop started"
        );

        loop {
            let deadline = self
                .frame_loop
                .next_deadline_ns()
                .map(|ns| self.epoch + Duration::from_nanos(ns));

            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(UiCommand::Stop) | None => break,
                    Some(command) => self.handle(command),
                },
                _ = sleep_until(deadline) => {
                    let out = self.frame_loop.poll_timers(self.now_ns());
                    self.publish(out);
                }
                _ = frames.tick() => self.frame(),
            }
        }

        self.stop_capture()?;
        let stats = self.frame_loop.stats();
        tracing::info!(
            processed = stats.frames_processed,
            skipped = stats.frames_skipped,
            triggers = stats.triggers_fired,
            "Frame loop stopped"
        );
        Ok(stats)
    }

    fn frame(&mut self) {
        let now = self.now_ns();
        let frame = if self.frame_loop.wants_estimate() && self.camera.is_running() {
            self.estimator.request(now);
            self.slot.take_latest()
        } else {
            self.slot.discard();
            None
        };

        let out = self.frame_loop.tick(now, frame);
        self.publish(out);

        if self.stats_log.should_tick(now) {
            let stats = self.frame_loop.stats();
            tracing::debug!(
                processed = stats.frames_processed,
                skipped = stats.frames_skipped,
                triggers = stats.triggers_fired,
                "Frame loop stats"
            );
        }
    }

    fn handle(&mut self, command: UiCommand) {
        let now = self.now_ns();
        match command {
            UiCommand::Activity => {
                if let Some(visible) = self.frame_loop.record_activity(now) {
                    self.sink.ui_visibility(visible);
                }
            }
            UiCommand::SetPresentation(on) => {
                if let Some(visible) = self.frame_loop.set_presentation(on, now) {
                    self.sink.ui_visibility(visible);
                }
            }
            UiCommand::SetInterval(interval) => self.frame_loop.set_interval(interval, now),
            UiCommand::SetProximity { enabled, threshold } => {
                if let Err(e) = self.frame_loop.set_proximity(enabled, threshold) {
                    tracing::warn!(error = %e, "Rejected proximity settings");
                }
            }
            UiCommand::SetCalibration(calibration) => {
                if let Err(e) = self.frame_loop.set_calibration(calibration) {
                    tracing::warn!(error = %e, "Rejected calibration");
                }
            }
            UiCommand::SetFollow(on) => self.frame_loop.set_follow(on),
            UiCommand::SetPaused(paused) => self.frame_loop.set_paused(paused),
            UiCommand::ManualTrigger => {
                let event = self.frame_loop.fire_manual(now);
                self.sink.trigger(&event);
            }
            UiCommand::Stop => {}
        }
    }

    fn publish(&mut self, out: FrameOutput) {
        if let Some(control) = out.control {
            self.sink.set_control(control);
        }
        for event in &out.events {
            self.sink.trigger(event);
        }
        if let Some(visible) = out.ui_visible {
            self.sink.ui_visibility(visible);
        }
    }

    pub fn frame_loop(&self) -> &FrameLoop<R> {
        &self.frame_loop
    }

    pub fn status(&self) -> SessionStatus {
        self.frame_loop.status()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
