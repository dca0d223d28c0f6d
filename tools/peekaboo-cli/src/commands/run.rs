//! Run a tracking stage.
//!
//! The subject is either scripted (a viewer swaying and stepping toward
//! and away from the camera) or replayed from a JSONL landmark recording.
//! Operator commands are read from stdin, one per line.

use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use tokio::sync::mpsc;

use peekaboo_common::config::{AppConfig, CalibrationConfig, TriggerInterval};
use peekaboo_tracking_engine::{
    frame_slot, FrameLoop, PoseEstimator, PoseScript, ReplayEstimator, ScriptedEstimator,
    StageRunner, UiCommand, VirtualCamera,
};

use crate::sink::ConsoleSink;

#[derive(Args)]
pub struct RunArgs {
    /// Replay landmarks from a JSONL recording instead of the scripted subject
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Restart the recording when it runs out
    #[arg(long, requires = "replay")]
    loop_replay: bool,

    /// Frames the scripted subject spends at each distance
    #[arg(long, default_value = "180")]
    half_period: u64,

    /// Drop every Nth scripted estimator result
    #[arg(long)]
    drop_every: Option<u64>,

    /// Stop after this many seconds
    #[arg(long)]
    seconds: Option<u64>,

    /// Frame loop rate (Hz)
    #[arg(long)]
    fps: Option<u32>,

    /// Do not run the calibration mapper (no aim updates)
    #[arg(long)]
    no_follow: bool,

    /// Calibration center X, percent of image width
    #[arg(long)]
    center_x: Option<f64>,

    /// Calibration center Y, percent of image height
    #[arg(long)]
    center_y: Option<f64>,

    /// Horizontal sensitivity in [0.5, 2.5]
    #[arg(long)]
    sensitivity_x: Option<f64>,

    /// Vertical sensitivity in [0.5, 2.5]
    #[arg(long)]
    sensitivity_y: Option<f64>,

    /// Timed trigger: 0 = off, N = every N seconds, -1 = random
    #[arg(long, allow_hyphen_values = true)]
    interval: Option<i64>,

    /// Proximity threshold in (0, 1]; also enables proximity triggers
    #[arg(long)]
    threshold: Option<f64>,

    /// Start in presentation mode
    #[arg(long)]
    presentation: bool,

    /// Simulate a camera that refuses access
    #[arg(long)]
    deny_camera: bool,

    /// Output JSON lines instead of text
    #[arg(long)]
    json: bool,
}

pub async fn run(mut config: AppConfig, args: RunArgs) -> anyhow::Result<()> {
    if let Some(fps) = args.fps {
        config.tracking.frame_rate_hz = fps;
    }
    if args.no_follow {
        config.tracking.follow_enabled = false;
    }
    let calibration = &mut config.calibration;
    for (value, slot) in [
        (args.center_x, &mut calibration.center_x),
        (args.center_y, &mut calibration.center_y),
        (args.sensitivity_x, &mut calibration.multiplier_x),
        (args.sensitivity_y, &mut calibration.multiplier_y),
    ] {
        if let Some(value) = value {
            *slot = value;
        }
    }
    if let Some(interval) = args.interval {
        config.triggers.interval = TriggerInterval::try_from(interval)?;
    }
    if let Some(threshold) = args.threshold {
        config.triggers.proximity_enabled = true;
        config.triggers.proximity_threshold = threshold;
    }
    if args.presentation {
        config.presentation.start_in_presentation = true;
    }
    config.validate().context("Invalid stage settings")?;

    let (publisher, slot) = frame_slot();
    let estimator: Box<dyn PoseEstimator> = match &args.replay {
        Some(path) => Box::new(ReplayEstimator::new(publisher, path).looping(args.loop_replay)),
        None => Box::new(ScriptedEstimator::new(
            publisher,
            PoseScript {
                half_period_frames: args.half_period,
                drop_every: args.drop_every,
                ..PoseScript::default()
            },
        )),
    };
    let camera = if args.deny_camera {
        VirtualCamera::denied()
    } else {
        VirtualCamera::granted()
    };

    let mut runner = StageRunner::new(
        FrameLoop::new(&config),
        Box::new(camera),
        estimator,
        slot,
        ConsoleSink::new(args.json),
        config.tracking.frame_rate_hz,
    );

    if !args.json {
        println!("Peekaboo stage");
        println!("  Frame rate: {} Hz", config.tracking.frame_rate_hz);
        println!("  Timed trigger: {}", config.triggers.interval);
        if config.triggers.proximity_enabled {
            println!("  Proximity: on (threshold {})", config.triggers.proximity_threshold);
        } else {
            println!("  Proximity: off");
        }
        println!("Commands: activity, trigger, pause, resume, follow on|off, interval N,");
        println!("          proximity on|off [T], presentation on|off, stop");
        println!();
    }

    // Either failure leaves the stage up so presentation controls keep working.
    match runner.load_model().await {
        Ok(()) => {
            if let Err(e) = runner.start_capture().await {
                eprintln!("Capture unavailable: {e}");
            }
        }
        Err(e) => eprintln!("Model unavailable: {e}"),
    }

    let (tx, rx) = mpsc::channel(32);
    spawn_stdin_reader(tx.clone(), PanelState::new(&config));
    let seconds = args.seconds;
    tokio::spawn(async move {
        match seconds {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
        let _ = tx.send(UiCommand::Stop).await;
    });

    let stats = runner.run(rx).await?;
    let sink = runner.sink();

    if !args.json {
        println!();
        println!("Session started: {}", sink.clock().epoch_wall());
        println!("  Duration: {:.1}s", sink.clock().elapsed_secs());
        println!("  Frames processed: {}", stats.frames_processed);
        println!("  Frames skipped: {}", stats.frames_skipped);
        println!("  Aim updates: {}", sink.controls);
        println!("  Triggers: {}", sink.triggers);
    }

    Ok(())
}

/// Operator settings carried from one command line to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PanelState {
    calibration: CalibrationConfig,
    proximity_threshold: f64,
}

impl PanelState {
    fn new(config: &AppConfig) -> Self {
        Self {
            calibration: config.calibration,
            proximity_threshold: config.triggers.proximity_threshold,
        }
    }
}

/// Forward operator commands typed on stdin.
///
/// Runs on a plain thread so a pending read never holds up shutdown.
fn spawn_stdin_reader(tx: mpsc::Sender<UiCommand>, mut panel: PanelState) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            match parse_command(&line, &mut panel) {
                Ok(Some(command)) => {
                    if tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => eprintln!("{e}"),
            }
        }
    });
}

/// Parse one operator command line.
///
/// `center X Y` and `sensitivity X Y` adjust the panel calibration in place
/// and send the whole calibration. `proximity on|off` reuses the last
/// threshold; `proximity on|off T` replaces it.
fn parse_command(line: &str, panel: &mut PanelState) -> anyhow::Result<Option<UiCommand>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words.as_slice() {
        [] => return Ok(None),
        ["activity"] => UiCommand::Activity,
        ["trigger"] => UiCommand::ManualTrigger,
        ["pause"] => UiCommand::SetPaused(true),
        ["resume"] => UiCommand::SetPaused(false),
        ["stop"] | ["quit"] => UiCommand::Stop,
        ["follow", state] => UiCommand::SetFollow(parse_switch(state)?),
        ["presentation", state] => UiCommand::SetPresentation(parse_switch(state)?),
        ["interval", value] => UiCommand::SetInterval(TriggerInterval::try_from(
            value.parse::<i64>()?,
        )?),
        ["proximity", state] => UiCommand::SetProximity {
            enabled: parse_switch(state)?,
            threshold: panel.proximity_threshold,
        },
        ["proximity", state, threshold] => {
            let enabled = parse_switch(state)?;
            panel.proximity_threshold = threshold.parse()?;
            UiCommand::SetProximity {
                enabled,
                threshold: panel.proximity_threshold,
            }
        }
        ["center", x, y] => {
            let calibration = &mut panel.calibration;
            calibration.center_x = x.parse()?;
            calibration.center_y = y.parse()?;
            UiCommand::SetCalibration(*calibration)
        }
        ["sensitivity", x, y] => {
            let calibration = &mut panel.calibration;
            calibration.multiplier_x = x.parse()?;
            calibration.multiplier_y = y.parse()?;
            UiCommand::SetCalibration(*calibration)
        }
        _ => anyhow::bail!("Unknown command: {line}"),
    };
    Ok(Some(command))
}

fn parse_switch(word: &str) -> anyhow::Result<bool> {
    match word {
        "on" => Ok(true),
        "off" => Ok(false),
        other => anyhow::bail!("Expected on|off, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peekaboo_pose_model::event::{PoseFrame, TriggerKind};
    use peekaboo_pose_model::landmark::{Landmark, LandmarkSet};
    use peekaboo_processing_core::proximity::ProximityState;

    fn panel() -> PanelState {
        PanelState::new(&AppConfig::default())
    }

    fn parse(line: &str) -> Option<UiCommand> {
        parse_command(line, &mut panel()).unwrap()
    }

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse(""), None);
        assert_eq!(parse("trigger"), Some(UiCommand::ManualTrigger));
        assert_eq!(parse("  pause "), Some(UiCommand::SetPaused(true)));
        assert_eq!(parse("follow off"), Some(UiCommand::SetFollow(false)));
        assert_eq!(parse("stop"), Some(UiCommand::Stop));
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(
            parse("interval -1"),
            Some(UiCommand::SetInterval(TriggerInterval::Random))
        );
        assert_eq!(
            parse("interval 45"),
            Some(UiCommand::SetInterval(TriggerInterval::Fixed { secs: 45 }))
        );
        assert!(parse_command("interval -7", &mut panel()).is_err());
    }

    #[test]
    fn test_calibration_accumulates() {
        let mut panel = panel();
        parse_command("center 40 60", &mut panel).unwrap();
        let command = parse_command("sensitivity 2 1.5", &mut panel).unwrap();
        let Some(UiCommand::SetCalibration(c)) = command else {
            panic!("expected calibration");
        };
        assert_eq!((c.center_x, c.center_y), (40.0, 60.0));
        assert_eq!((c.multiplier_x, c.multiplier_y), (2.0, 1.5));
    }

    #[test]
    fn test_unknown_command() {
        assert!(parse_command("jump", &mut panel()).is_err());
        assert!(parse_command("follow maybe", &mut panel()).is_err());
    }

    #[test]
    fn test_proximity_toggle_keeps_threshold() {
        let mut config = AppConfig::default();
        config.triggers.proximity_enabled = true;
        config.triggers.proximity_threshold = 0.3;
        let mut panel = PanelState::new(&config);

        let mut frame_loop = FrameLoop::new(&config);
        frame_loop.begin_model_load().unwrap();
        frame_loop.model_ready().unwrap();
        frame_loop.capture_started(0).unwrap();

        let close = || PoseFrame::new(0, LandmarkSet::new(vec![Landmark::new(0.5, 0.5, -0.4)]));
        let out = frame_loop.tick(1_000_000, Some(close()));
        assert_eq!(out.kinds(), vec![TriggerKind::Primary]);

        for line in ["proximity off", "proximity on"] {
            let Some(UiCommand::SetProximity { enabled, threshold }) =
                parse_command(line, &mut panel).unwrap()
            else {
                panic!("expected proximity command for {line}");
            };
            assert_eq!(threshold, 0.3);
            frame_loop.set_proximity(enabled, threshold).unwrap();
        }

        // Same depth, same threshold: the viewer is still close.
        let out = frame_loop.tick(2_000_000, Some(close()));
        assert!(out.events.is_empty());
        assert_eq!(frame_loop.proximity_state(), ProximityState::Close);
    }

    #[test]
    fn test_proximity_threshold_is_remembered() {
        let mut panel = panel();
        parse_command("proximity on 0.7", &mut panel).unwrap();
        assert_eq!(
            parse_command("proximity off", &mut panel).unwrap(),
            Some(UiCommand::SetProximity {
                enabled: false,
                threshold: 0.7
            })
        );
        assert!(parse_command("proximity on close", &mut panel).is_err());
        assert_eq!(panel.proximity_threshold, 0.7);
    }
}
