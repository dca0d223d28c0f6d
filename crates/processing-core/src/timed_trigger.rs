//! Timed trigger scheduling.
//!
//! A self-rescheduling single-shot timer: each firing arms the next cycle
//! with a freshly computed delay, measured from the moment it fired. This
//! keeps slow downstream handling from causing overlap or catch-up bursts.
//!
//! The scheduler is driven by explicit `now_ns` readings rather than owning
//! a real timer, so the host's timer (or a test) decides when to `poll`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use peekaboo_common::clock::{ms_to_ns, ns_to_ms};
use peekaboo_common::config::TriggerInterval;
use peekaboo_pose_model::event::TriggerKind;

/// Lower bound (inclusive) of a randomized delay.
pub const RANDOM_MIN_MS: u64 = 30_000;

/// Upper bound (exclusive) of a randomized delay.
pub const RANDOM_MAX_MS: u64 = 120_000;

/// Scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Stopped,
    Scheduled,
}

/// The single pending callback while the scheduler is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingFire {
    /// When the callback is due on the session clock.
    pub deadline_ns: u64,
    /// Delay this cycle was armed with.
    pub delay_ms: u64,
}

/// Fires `Primary` on a fixed or randomized cadence while a session is active.
#[derive(Debug)]
pub struct TimedTriggerScheduler<R: Rng = StdRng> {
    interval: TriggerInterval,
    session_active: bool,
    pending: Option<PendingFire>,
    rng: R,
    fired: u64,
}

impl TimedTriggerScheduler<StdRng> {
    /// Create a stopped scheduler seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for TimedTriggerScheduler<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> TimedTriggerScheduler<R> {
    /// Create a stopped scheduler drawing random delays from `rng`.
    pub fn with_rng(rng: R) -> Self {
        Self {
            interval: TriggerInterval::Disabled,
            session_active: false,
            pending: None,
            rng,
            fired: 0,
        }
    }

    /// Change the cadence. Re-arms immediately if the session is active.
    ///
    /// Setting the same interval again leaves the pending cycle alone.
    pub fn set_interval(&mut self, interval: TriggerInterval, now_ns: u64) {
        if interval == self.interval {
            return;
        }
        tracing::debug!(%interval, "Timed trigger interval changed");
        self.interval = interval;
        self.refresh(now_ns);
    }

    /// Gate the scheduler on the owning session's lifetime.
    pub fn set_session_active(&mut self, active: bool, now_ns: u64) {
        if active == self.session_active {
            return;
        }
        self.session_active = active;
        self.refresh(now_ns);
    }

    /// Delay for the next cycle, or `None` when disabled.
    ///
    /// Random mode draws a fresh sample on every call.
    pub fn next_delay_ms(&mut self) -> Option<u64> {
        match self.interval {
            TriggerInterval::Disabled => None,
            TriggerInterval::Fixed { secs } => Some(secs as u64 * 1000),
            TriggerInterval::Random => Some(self.rng.gen_range(RANDOM_MIN_MS..RANDOM_MAX_MS)),
        }
    }

    /// Fire if the pending callback is due, then re-arm from `now_ns`.
    pub fn poll(&mut self, now_ns: u64) -> Option<TriggerKind> {
        let pending = self.pending?;
        if now_ns < pending.deadline_ns {
            return None;
        }

        self.pending = None;
        self.fired += 1;
        tracing::debug!(
            fired = self.fired,
            late_ms = ns_to_ms(now_ns - pending.deadline_ns),
            "Timed trigger fired"
        );
        self.arm(now_ns);
        Some(TriggerKind::Primary)
    }

    /// Drop any pending callback. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            tracing::debug!("Timed trigger cancelled");
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.pending.is_some() {
            SchedulerState::Scheduled
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn pending(&self) -> Option<PendingFire> {
        self.pending
    }

    pub fn next_deadline_ns(&self) -> Option<u64> {
        self.pending.map(|p| p.deadline_ns)
    }

    pub fn interval(&self) -> TriggerInterval {
        self.interval
    }

    /// Number of times this scheduler has fired.
    pub fn fired_count(&self) -> u64 {
        self.fired
    }

    fn refresh(&mut self, now_ns: u64) {
        self.cancel();
        if self.session_active {
            self.arm(now_ns);
        }
    }

    fn arm(&mut self, now_ns: u64) {
        // Never leave a stale callback behind.
        self.pending = None;
        if let Some(delay_ms) = self.next_delay_ms() {
            self.pending = Some(PendingFire {
                deadline_ns: now_ns + ms_to_ns(delay_ms),
                delay_ms,
            });
            tracing::trace!(delay_ms, "Timed trigger armed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha8Rng;

    const SEC: u64 = 1_000_000_000;

    fn scheduler() -> TimedTriggerScheduler<ChaCha8Rng> {
        TimedTriggerScheduler::with_rng(ChaCha8Rng::seed_from_u64(7))
    }

    #[test]
    fn test_fixed_interval_fires_on_boundaries() {
        let mut s = scheduler();
        s.set_session_active(true, 0);
        s.set_interval(TriggerInterval::Fixed { secs: 30 }, 0);

        let mut fired_at = Vec::new();
        for second in 0..=300 {
            if s.poll(second * SEC).is_some() {
                fired_at.push(second);
            }
        }
        assert_eq!(fired_at, (1..=10).map(|n| n * 30).collect::<Vec<_>>());
        assert_eq!(s.state(), SchedulerState::Scheduled);
    }

    #[test]
    fn test_rearms_from_fire_time_not_deadline() {
        let mut s = scheduler();
        s.set_session_active(true, 0);
        s.set_interval(TriggerInterval::Fixed { secs: 30 }, 0);

        // Host delivered the callback 5s late.
        assert_eq!(s.poll(35 * SEC), Some(TriggerKind::Primary));
        assert_eq!(s.next_deadline_ns(), Some(65 * SEC));
        // One late poll never yields a burst of catch-up fires.
        assert_eq!(s.poll(35 * SEC), None);
    }

    #[test]
    fn test_random_delays_stay_in_range() {
        let mut s = scheduler();
        s.set_interval(TriggerInterval::Random, 0);
        let delays: Vec<u64> = (0..1000).map(|_| s.next_delay_ms().unwrap()).collect();
        assert!(delays
            .iter()
            .all(|d| (RANDOM_MIN_MS..RANDOM_MAX_MS).contains(d)));
        // Independently sampled, not one repeated value.
        assert!(delays.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_random_mode_resamples_each_cycle() {
        let mut s = scheduler();
        s.set_session_active(true, 0);
        s.set_interval(TriggerInterval::Random, 0);

        let mut delays = Vec::new();
        let mut now = 0;
        for _ in 0..20 {
            let pending = s.pending().unwrap();
            delays.push(pending.delay_ms);
            now = pending.deadline_ns;
            assert_eq!(s.poll(now), Some(TriggerKind::Primary));
        }
        assert!(now > 0);
        assert!(delays.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_disable_cancels_pending() {
        let mut s = scheduler();
        s.set_session_active(true, 0);
        s.set_interval(TriggerInterval::Fixed { secs: 30 }, 0);
        s.set_interval(TriggerInterval::Disabled, 10 * SEC);

        assert_eq!(s.state(), SchedulerState::Stopped);
        assert_eq!(s.poll(1000 * SEC), None);
    }

    #[test]
    fn test_session_end_cancels_and_restart_rearms() {
        let mut s = scheduler();
        s.set_interval(TriggerInterval::Fixed { secs: 60 }, 0);
        // Not active yet: nothing scheduled.
        assert_eq!(s.state(), SchedulerState::Stopped);

        s.set_session_active(true, 5 * SEC);
        assert_eq!(s.next_deadline_ns(), Some(65 * SEC));

        s.set_session_active(false, 20 * SEC);
        assert_eq!(s.poll(100 * SEC), None);

        s.set_session_active(true, 200 * SEC);
        assert_eq!(s.next_deadline_ns(), Some(260 * SEC));
    }

    #[test]
    fn test_changing_interval_replaces_pending() {
        let mut s = scheduler();
        s.set_session_active(true, 0);
        s.set_interval(TriggerInterval::Fixed { secs: 120 }, 0);
        s.set_interval(TriggerInterval::Fixed { secs: 30 }, 10 * SEC);

        assert_eq!(s.next_deadline_ns(), Some(40 * SEC));
        assert_eq!(s.poll(40 * SEC), Some(TriggerKind::Primary));
        // The old 120s callback is gone.
        assert_eq!(s.poll(120 * SEC), Some(TriggerKind::Primary));
        assert_eq!(s.fired_count(), 2);
        assert_eq!(s.next_deadline_ns(), Some(150 * SEC));
    }

    #[test]
    fn test_same_interval_keeps_pending_cycle() {
        let mut s = scheduler();
        s.set_session_active(true, 0);
        s.set_interval(TriggerInterval::Fixed { secs: 30 }, 0);
        s.set_interval(TriggerInterval::Fixed { secs: 30 }, 20 * SEC);
        assert_eq!(s.next_deadline_ns(), Some(30 * SEC));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut s = scheduler();
        s.cancel();
        s.cancel();
        assert_eq!(s.state(), SchedulerState::Stopped);
    }
}
