//! Terminal animation sink.
//!
//! Every line is stamped from the sink's own session clock.

use std::io::Write;

use serde::Serialize;

use peekaboo_common::clock::{RateController, SessionClock};
use peekaboo_pose_model::event::{TriggerEvent, TriggerKind, TriggerSource};
use peekaboo_pose_model::landmark::ControlCoordinate;
use peekaboo_tracking_engine::{AnimationSink, SessionStatus};

/// Aim updates are printed at most this often.
const CONTROL_PRINT_HZ: u32 = 4;

/// One line of `--json` output.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputLine {
    Control { t: f64, x: f64, y: f64 },
    Trigger {
        t: f64,
        kind: TriggerKind,
        source: TriggerSource,
    },
    Ui { t: f64, visible: bool },
    Status { t: f64, status: SessionStatus },
}

/// Prints what the stage produces, as text or JSON lines.
pub struct ConsoleSink {
    json: bool,
    out: Box<dyn Write + Send>,
    clock: SessionClock,
    control_rate: RateController,
    pub controls: u64,
    pub triggers: u64,
}

impl ConsoleSink {
    pub fn new(json: bool) -> Self {
        Self::with_writer(json, Box::new(std::io::stdout()))
    }

    pub fn with_writer(json: bool, out: Box<dyn Write + Send>) -> Self {
        Self {
            json,
            out,
            clock: SessionClock::start(),
            control_rate: RateController::new(CONTROL_PRINT_HZ),
            controls: 0,
            triggers: 0,
        }
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    fn now(&self) -> f64 {
        self.clock.elapsed_secs()
    }

    fn emit(&mut self, line: OutputLine, text: impl FnOnce() -> String) {
        let rendered = if self.json {
            match serde_json::to_string(&line) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to serialize output line");
                    return;
                }
            }
        } else {
            text()
        };
        if let Err(e) = writeln!(self.out, "{rendered}") {
            tracing::warn!(error = %e, "Failed to write output line");
        }
    }
}

impl AnimationSink for ConsoleSink {
    fn set_control(&mut self, control: ControlCoordinate) {
        self.controls += 1;
        if !self.control_rate.should_tick(self.clock.elapsed_ns()) {
            return;
        }
        let t = self.now();
        self.emit(
            OutputLine::Control {
                t,
                x: control.x,
                y: control.y,
            },
            || format!("[{t:7.2}s] aim  ({:6.1}, {:6.1})", control.x, control.y),
        );
    }

    fn trigger(&mut self, event: &TriggerEvent) {
        self.triggers += 1;
        let t = self.now();
        let (kind, source) = (event.kind, event.source);
        self.emit(OutputLine::Trigger { t, kind, source }, || {
            format!("[{t:7.2}s] {kind:?} ({source:?})")
        });
    }

    fn ui_visibility(&mut self, visible: bool) {
        let t = self.now();
        self.emit(OutputLine::Ui { t, visible }, || {
            let state = if visible { "shown" } else { "hidden" };
            format!("[{t:7.2}s] controls {state}")
        });
    }

    fn status(&mut self, status: SessionStatus) {
        let t = self.now();
        self.emit(OutputLine::Status { t, status }, || {
            format!("[{t:7.2}s] status {status:?}")
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn lines(buf: &SharedBuf) -> Vec<serde_json::Value> {
        let bytes = buf.0.lock().unwrap().clone();
        String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_all_lines_share_the_sink_clock() {
        let buf = SharedBuf::default();
        let mut sink = ConsoleSink::with_writer(true, Box::new(buf.clone()));

        sink.status(SessionStatus::Running);
        // Far in the future on some other timebase.
        sink.trigger(&TriggerEvent::primary(500_000_000_000, TriggerSource::Timed));
        sink.set_control(ControlCoordinate::CENTER);

        let lines = lines(&buf);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1]["type"], "trigger");
        assert_eq!(lines[1]["kind"], "primary");
        let stamps: Vec<f64> = lines.iter().map(|l| l["t"].as_f64().unwrap()).collect();
        assert!(stamps.iter().all(|t| *t < 60.0));
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(sink.triggers, 1);
    }

    #[test]
    fn test_control_output_is_throttled() {
        let buf = SharedBuf::default();
        let mut sink = ConsoleSink::with_writer(false, Box::new(buf.clone()));
        for _ in 0..10 {
            sink.set_control(ControlCoordinate::new(40.0, 60.0));
        }
        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert_eq!(sink.controls, 10);
    }
}
