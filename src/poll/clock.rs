//! Time source for the poller.
//!
//! Production code sleeps on the cancellation token so Ctrl-C wakes a
//! sleeping poll. Tests use [`ManualClock`], which advances virtual time
//! instead of blocking.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    /// Sleep for `duration`, returning early if `cancel` fires.
    fn sleep(&self, duration: Duration, cancel: &CancelToken);
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) {
        if duration.is_zero() {
            return;
        }
        cancel.wait_timeout(duration);
    }
}

#[derive(Debug)]
struct ManualState {
    now: Instant,
    sleeps: Vec<Duration>,
}

/// Virtual clock: `sleep` records the requested duration and moves time
/// forward without blocking.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualState>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: Instant::now(),
                sleeps: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move time forward without recording a sleep.
    pub fn advance(&self, by: Duration) {
        self.lock().now += by;
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.lock().sleeps.iter().sum()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.lock().now
    }

    fn sleep(&self, duration: Duration, _cancel: &CancelToken) {
        let mut state = self.lock();
        state.now += duration;
        state.sleeps.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_secs(30), &CancelToken::new());
        clock.sleep(Duration::from_secs(2), &CancelToken::new());

        assert_eq!(clock.now() - start, Duration::from_secs(32));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(30), Duration::from_secs(2)]);
        assert_eq!(clock.total_slept(), Duration::from_secs(32));
    }

    #[test]
    fn test_advance_is_not_a_sleep() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now() - start, Duration::from_secs(5));
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_system_clock_sleep_is_cut_short_by_cancel() {
        let token = CancelToken::new();
        token.cancel();
        let start = Instant::now();
        SystemClock.sleep(Duration::from_secs(30), &token);
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
