//! Overlay visibility during full-screen presentation.
//!
//! Outside presentation mode the controls are always shown. In presentation
//! mode every activity signal shows them and restarts a single idle timer;
//! when the timer runs out they hide. The timer measures time since the last
//! activity, so a steady stream of activity keeps the UI up indefinitely.

use peekaboo_common::clock::ms_to_ns;

/// How long the UI stays visible after the last activity.
pub const IDLE_TIMEOUT_MS: u64 = 3000;

/// Tracks pointer/touch activity and derives `ui_visible`.
#[derive(Debug, Clone)]
pub struct ActivityTracker {
    timeout_ns: u64,
    presentation: bool,
    ui_visible: bool,
    idle_deadline_ns: Option<u64>,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::with_timeout_ms(IDLE_TIMEOUT_MS)
    }

    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        Self {
            timeout_ns: ms_to_ns(timeout_ms),
            presentation: false,
            ui_visible: true,
            idle_deadline_ns: None,
        }
    }

    /// Enter or leave presentation mode.
    ///
    /// Returns the new visibility if it changed.
    pub fn set_presentation(&mut self, presentation: bool, now_ns: u64) -> Option<bool> {
        let before = self.ui_visible;
        self.presentation = presentation;
        if presentation {
            self.show_and_rearm(now_ns);
        } else {
            self.idle_deadline_ns = None;
            self.ui_visible = true;
        }
        self.changed_from(before)
    }

    /// Register a pointer/touch signal.
    ///
    /// Returns the new visibility if it changed.
    pub fn record_activity(&mut self, now_ns: u64) -> Option<bool> {
        if !self.presentation {
            return None;
        }
        let before = self.ui_visible;
        self.show_and_rearm(now_ns);
        self.changed_from(before)
    }

    /// Hide the UI if the idle timer has run out.
    ///
    /// Returns `Some(false)` exactly once per idle period.
    pub fn poll(&mut self, now_ns: u64) -> Option<bool> {
        let deadline = self.idle_deadline_ns?;
        if now_ns < deadline {
            return None;
        }
        self.idle_deadline_ns = None;
        let before = self.ui_visible;
        self.ui_visible = false;
        tracing::debug!("Presentation idle; hiding controls");
        self.changed_from(before)
    }

    pub fn ui_visible(&self) -> bool {
        self.ui_visible
    }

    pub fn in_presentation(&self) -> bool {
        self.presentation
    }

    pub fn next_deadline_ns(&self) -> Option<u64> {
        self.idle_deadline_ns
    }

    fn show_and_rearm(&mut self, now_ns: u64) {
        self.ui_visible = true;
        self.idle_deadline_ns = Some(now_ns + self.timeout_ns);
    }

    fn changed_from(&self, before: bool) -> Option<bool> {
        (before != self.ui_visible).then_some(self.ui_visible)
    }
}

impl Default for ActivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: u64 = 1_000_000;

    #[test]
    fn test_visible_outside_presentation() {
        let mut tracker = ActivityTracker::new();
        assert!(tracker.ui_visible());
        assert_eq!(tracker.record_activity(0), None);
        assert_eq!(tracker.poll(10_000 * MS), None);
        assert!(tracker.ui_visible());
        assert_eq!(tracker.next_deadline_ns(), None);
    }

    #[test]
    fn test_hides_after_timeout_in_presentation() {
        let mut tracker = ActivityTracker::new();
        tracker.set_presentation(true, 0);
        assert_eq!(tracker.poll(2_999 * MS), None);
        assert_eq!(tracker.poll(3_000 * MS), Some(false));
        assert!(!tracker.ui_visible());
        // Only once.
        assert_eq!(tracker.poll(9_000 * MS), None);
    }

    #[test]
    fn test_activity_stream_debounces() {
        let mut tracker = ActivityTracker::new();
        tracker.set_presentation(true, 0);

        let mut hidden_count = 0;
        let mut now = 0;
        for _ in 0..50 {
            now += 2_500 * MS;
            if tracker.poll(now) == Some(false) {
                hidden_count += 1;
            }
            tracker.record_activity(now);
            assert!(tracker.ui_visible());
        }
        assert_eq!(hidden_count, 0);

        // A full gap flips it exactly once.
        for step in 1..=10 {
            if tracker.poll(now + step * 1_000 * MS) == Some(false) {
                hidden_count += 1;
            }
        }
        assert_eq!(hidden_count, 1);
    }

    #[test]
    fn test_activity_after_hide_shows_again() {
        let mut tracker = ActivityTracker::new();
        tracker.set_presentation(true, 0);
        tracker.poll(3_000 * MS);
        assert_eq!(tracker.record_activity(4_000 * MS), Some(true));
        assert_eq!(tracker.next_deadline_ns(), Some(7_000 * MS));
    }

    #[test]
    fn test_leaving_presentation_forces_visible_and_cancels() {
        let mut tracker = ActivityTracker::new();
        tracker.set_presentation(true, 0);
        tracker.poll(3_000 * MS);
        assert_eq!(tracker.set_presentation(false, 3_500 * MS), Some(true));
        assert_eq!(tracker.next_deadline_ns(), None);
        assert_eq!(tracker.poll(100_000 * MS), None);
    }
}
