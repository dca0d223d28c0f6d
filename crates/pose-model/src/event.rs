//! Pose frames and discrete trigger events.
//!
//! Pose frames can be replayed from JSONL files (one frame per line,
//! `#` lines are comments). Trigger events are what the animation engine
//! receives; they are fire-and-forget.

use serde::{Deserialize, Serialize};

use peekaboo_common::error::{PeekabooError, PeekabooResult};

use crate::landmark::LandmarkSet;

/// Monotonic timestamp in nanoseconds on the session clock.
pub type TimestampNs = u64;

/// One estimator result, keyed by the timestamp it was requested for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    #[serde(rename = "t")]
    pub timestamp_ns: TimestampNs,

    pub landmarks: LandmarkSet,
}

impl PoseFrame {
    pub fn new(timestamp_ns: TimestampNs, landmarks: LandmarkSet) -> Self {
        Self {
            timestamp_ns,
            landmarks,
        }
    }
}

/// Which of the two animation cues to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// The main action (e.g. the jump-scare).
    Primary,
    /// The complementary "leave" action.
    Secondary,
}

/// What caused a trigger to fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Proximity,
    Timed,
    Manual,
}

/// A discrete animation cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "t")]
    pub timestamp_ns: TimestampNs,

    pub kind: TriggerKind,

    pub source: TriggerSource,
}

impl TriggerEvent {
    pub fn new(timestamp_ns: TimestampNs, kind: TriggerKind, source: TriggerSource) -> Self {
        Self {
            timestamp_ns,
            kind,
            source,
        }
    }

    pub fn primary(timestamp_ns: TimestampNs, source: TriggerSource) -> Self {
        Self::new(timestamp_ns, TriggerKind::Primary, source)
    }

    pub fn secondary(timestamp_ns: TimestampNs, source: TriggerSource) -> Self {
        Self::new(timestamp_ns, TriggerKind::Secondary, source)
    }
}

/// Parse pose frames from JSONL content.
///
/// Errors name the offending (1-based) line.
pub fn parse_frames(jsonl: &str) -> PeekabooResult<Vec<PoseFrame>> {
    jsonl
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_no, line)| {
            serde_json::from_str(line)
                .map_err(|e| PeekabooError::pose(format!("line {line_no}: {e}")))
        })
        .collect()
}

/// Serialize frames to JSONL format.
pub fn serialize_frames(frames: &[PoseFrame]) -> PeekabooResult<String> {
    let mut output = String::new();
    for frame in frames {
        output.push_str(&serde_json::to_string(frame)?);
        output.push('\n');
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Landmark;

    #[test]
    fn test_parse_frames_skips_comments_and_blanks() {
        let jsonl = "# recorded at 30 fps\n\n{\"t\":0,\"landmarks\":[{\"x\":0.5,\"y\":0.4,\"z\":-0.2}]}\n";
        let frames = parse_frames(jsonl).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].landmarks.primary(),
            Some(&Landmark::new(0.5, 0.4, -0.2))
        );
    }

    #[test]
    fn test_parse_frames_reports_line_number() {
        let jsonl = "{\"t\":0,\"landmarks\":[]}\n{\"t\":1,\"landmarks\":oops}\n";
        let err = parse_frames(jsonl).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn test_serialized_frames_parse_back() {
        let frames = vec![
            PoseFrame::new(0, LandmarkSet::new(vec![Landmark::new(0.1, 0.2, -0.1)])),
            PoseFrame::new(33_000_000, LandmarkSet::default()),
        ];
        let jsonl = serialize_frames(&frames).unwrap();
        assert_eq!(parse_frames(&jsonl).unwrap(), frames);
    }

    #[test]
    fn test_trigger_event_json_shape() {
        let event = TriggerEvent::primary(42, TriggerSource::Proximity);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"t\":42"));
        assert!(json.contains("\"kind\":\"primary\""));
        assert!(json.contains("\"source\":\"proximity\""));
    }
}
