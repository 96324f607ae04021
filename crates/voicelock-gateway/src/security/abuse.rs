//! Abuse prevention: per-caller rate limiting and replay suppression.
//!
//! State lives in process-wide concurrent maps keyed by caller identity.
//! The check-and-increment sequence runs while holding the map's per-key
//! entry guard, so two simultaneous requests from one caller cannot both
//! pass the quota check on a multi-threaded runtime.
//!
//! Entries are never evicted; a single long-lived low-traffic deployment
//! accumulates one entry per distinct caller for the process lifetime.

use crate::domain::caller::CallerIdentity;
use crate::domain::config::ThrottleConfig;
use crate::security::clock::Clock;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    Blocked { retry_after: Duration },
}

/// Outcome of a replay window check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayDecision {
    Allowed,
    Blocked { wait: Duration },
}

#[derive(Debug)]
struct WindowState {
    count: u32,
    reset_at: Instant,
}

/// Fixed resetting window: at most `max_attempts` gated attempts per caller
/// per `window`. Every gated attempt consumes quota, including attempts that
/// later fail; only signature and allow-list rejections happen upstream of
/// this counter.
pub struct RateLimiter {
    windows: DashMap<CallerIdentity, WindowState>,
    window: Duration,
    max_attempts: u32,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_attempts: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_attempts,
            clock,
        }
    }

    /// Check the caller's quota and consume one attempt if allowed.
    pub fn check_and_consume(&self, caller: &CallerIdentity) -> RateDecision {
        let now = self.clock.now();
        let mut state = self
            .windows
            .entry(caller.clone())
            .or_insert_with(|| {
                debug!(caller = %caller, "creating rate limit window");
                WindowState {
                    count: 0,
                    reset_at: now + self.window,
                }
            });

        // Entry guard held: the check-and-increment below is atomic per caller.
        if state.count == 0 || now >= state.reset_at {
            state.count = 1;
            state.reset_at = now + self.window;
            return RateDecision::Allowed;
        }
        if state.count >= self.max_attempts {
            return RateDecision::Blocked {
                retry_after: state.reset_at.saturating_duration_since(now),
            };
        }
        state.count += 1;
        RateDecision::Allowed
    }

    /// Number of tracked callers
    pub fn tracked_callers(&self) -> usize {
        self.windows.len()
    }
}

/// Minimum interval between two *successful* toggles by the same caller.
///
/// Only [`ReplayGuard::mark_success`] writes state; a blocked or failed
/// attempt leaves it untouched, so a caller whose toggle failed can retry
/// immediately.
pub struct ReplayGuard {
    last_success: DashMap<CallerIdentity, Instant>,
    min_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl ReplayGuard {
    pub fn new(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            last_success: DashMap::new(),
            min_interval,
            clock,
        }
    }

    pub fn check(&self, caller: &CallerIdentity) -> ReplayDecision {
        let now = self.clock.now();
        if let Some(last) = self.last_success.get(caller) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < self.min_interval {
                return ReplayDecision::Blocked {
                    wait: self.min_interval - elapsed,
                };
            }
        }
        ReplayDecision::Allowed
    }

    /// Record a successful toggle. Call only after the command round-trip
    /// to the vehicle completed.
    pub fn mark_success(&self, caller: &CallerIdentity) {
        self.last_success.insert(caller.clone(), self.clock.now());
    }
}

/// Rate limiter and replay guard behind one injection point.
pub struct AbuseGuard {
    rate: RateLimiter,
    replay: ReplayGuard,
}

impl AbuseGuard {
    pub fn new(config: &ThrottleConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            rate: RateLimiter::new(config.window, config.max_attempts, Arc::clone(&clock)),
            replay: ReplayGuard::new(config.replay_interval, clock),
        }
    }

    pub fn check_rate(&self, caller: &CallerIdentity) -> RateDecision {
        self.rate.check_and_consume(caller)
    }

    pub fn check_replay(&self, caller: &CallerIdentity) -> ReplayDecision {
        self.replay.check(caller)
    }

    pub fn mark_success(&self, caller: &CallerIdentity) {
        self.replay.mark_success(caller)
    }

    pub fn tracked_callers(&self) -> usize {
        self.rate.tracked_callers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::clock::ManualClock;

    const WINDOW: Duration = Duration::from_secs(300);
    const MAX: u32 = 5;
    const REPLAY: Duration = Duration::from_secs(10);

    fn caller(raw: &str) -> CallerIdentity {
        CallerIdentity::normalize(Some(raw)).unwrap()
    }

    fn rate_limiter() -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::new(WINDOW, MAX, clock.clone());
        (limiter, clock)
    }

    #[test]
    fn test_first_five_allowed_sixth_blocked() {
        let (limiter, _clock) = rate_limiter();
        let alice = caller("+15551234567");

        for attempt in 1..=5 {
            assert_eq!(
                limiter.check_and_consume(&alice),
                RateDecision::Allowed,
                "attempt {attempt} should be allowed"
            );
        }
        match limiter.check_and_consume(&alice) {
            RateDecision::Blocked { retry_after } => assert!(retry_after > Duration::ZERO),
            RateDecision::Allowed => panic!("sixth attempt should be blocked"),
        }
    }

    #[test]
    fn test_window_elapse_resets_counter() {
        let (limiter, clock) = rate_limiter();
        let alice = caller("+15551234567");

        for _ in 0..5 {
            limiter.check_and_consume(&alice);
        }
        assert!(matches!(
            limiter.check_and_consume(&alice),
            RateDecision::Blocked { .. }
        ));

        clock.advance(WINDOW + Duration::from_secs(1));

        // Counter reset to 1: the full budget is available again.
        for attempt in 1..=5 {
            assert_eq!(
                limiter.check_and_consume(&alice),
                RateDecision::Allowed,
                "attempt {attempt} after reset should be allowed"
            );
        }
        assert!(matches!(
            limiter.check_and_consume(&alice),
            RateDecision::Blocked { .. }
        ));
    }

    #[test]
    fn test_retry_after_shrinks_as_window_ages() {
        let (limiter, clock) = rate_limiter();
        let alice = caller("+15551234567");

        for _ in 0..5 {
            limiter.check_and_consume(&alice);
        }
        clock.advance(Duration::from_secs(100));
        match limiter.check_and_consume(&alice) {
            RateDecision::Blocked { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(200));
            }
            RateDecision::Allowed => panic!("should still be blocked"),
        }
    }

    #[test]
    fn test_callers_are_throttled_independently() {
        let (limiter, _clock) = rate_limiter();
        let alice = caller("+15551234567");
        let bob = caller("+15550001111");

        for _ in 0..5 {
            limiter.check_and_consume(&alice);
        }
        assert!(matches!(
            limiter.check_and_consume(&alice),
            RateDecision::Blocked { .. }
        ));
        assert_eq!(limiter.check_and_consume(&bob), RateDecision::Allowed);
        assert_eq!(limiter.tracked_callers(), 2);
    }

    #[test]
    fn test_replay_blocked_inside_interval() {
        let clock = Arc::new(ManualClock::new());
        let guard = ReplayGuard::new(REPLAY, clock.clone());
        let alice = caller("+15551234567");

        assert_eq!(guard.check(&alice), ReplayDecision::Allowed);
        guard.mark_success(&alice);

        clock.advance(Duration::from_secs(5));
        match guard.check(&alice) {
            ReplayDecision::Blocked { wait } => assert_eq!(wait, Duration::from_secs(5)),
            ReplayDecision::Allowed => panic!("check inside replay window should block"),
        }

        clock.advance(Duration::from_secs(6));
        assert_eq!(guard.check(&alice), ReplayDecision::Allowed);
    }

    #[test]
    fn test_replay_state_only_written_on_success() {
        let clock = Arc::new(ManualClock::new());
        let guard = ReplayGuard::new(REPLAY, clock.clone());
        let alice = caller("+15551234567");

        // Checks alone never start a window.
        assert_eq!(guard.check(&alice), ReplayDecision::Allowed);
        clock.advance(Duration::from_secs(1));
        assert_eq!(guard.check(&alice), ReplayDecision::Allowed);
    }

    #[test]
    fn test_abuse_guard_wires_both_policies() {
        let clock = Arc::new(ManualClock::new());
        let guard = AbuseGuard::new(&ThrottleConfig::default(), clock.clone());
        let alice = caller("+15551234567");

        assert_eq!(guard.check_rate(&alice), RateDecision::Allowed);
        assert_eq!(guard.check_replay(&alice), ReplayDecision::Allowed);
        guard.mark_success(&alice);
        assert!(matches!(
            guard.check_replay(&alice),
            ReplayDecision::Blocked { .. }
        ));
    }
}
