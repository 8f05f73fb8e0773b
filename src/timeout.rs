//! Poll deadlines
//!
//! Polling is unbounded by default. A caller may bound the total wall-clock
//! time of a single poll with a deadline; the poller checks it before every
//! status query and never sleeps past it.
//!
//! The deadline does not cancel anything remotely. It only tells the caller
//! to stop waiting.

use std::time::{Duration, Instant};

/// Upper bound accepted for a poll timeout (7 days).
pub const MAX_TIMEOUT_SECONDS: u64 = 7 * 24 * 3600;

/// Timeout validation errors
#[derive(Debug, thiserror::Error)]
pub enum TimeoutValidationError {
    #[error("poll timeout must be in (0, {max}] seconds, got {value}")]
    OutOfBounds { value: u64, max: u64 },
}

/// Validate a poll timeout given in seconds
pub fn validate_timeout_seconds(value: u64) -> Result<(), TimeoutValidationError> {
    if value == 0 || value > MAX_TIMEOUT_SECONDS {
        return Err(TimeoutValidationError::OutOfBounds {
            value,
            max: MAX_TIMEOUT_SECONDS,
        });
    }
    Ok(())
}

/// Deadline check result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStatus {
    Ok,
    Exceeded,
}

impl TimeoutStatus {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TimeoutStatus::Exceeded)
    }
}

/// Optional wall-clock bound, measured from when polling started.
///
/// All methods take `now` explicitly so the poller can drive them from an
/// injected clock.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub fn new(started: Instant, limit: Option<Duration>) -> Self {
        Self { started, limit }
    }

    pub fn unbounded(started: Instant) -> Self {
        Self::new(started, None)
    }

    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    /// Time left, or None when unbounded.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.limit
            .map(|limit| limit.saturating_sub(self.elapsed(now)))
    }

    pub fn check(&self, now: Instant) -> TimeoutStatus {
        match self.limit {
            Some(limit) if self.elapsed(now) >= limit => TimeoutStatus::Exceeded,
            _ => TimeoutStatus::Ok,
        }
    }

    /// Shorten `wanted` so a sleep never runs past the deadline.
    pub fn clamp_sleep(&self, now: Instant, wanted: Duration) -> Duration {
        match self.remaining(now) {
            Some(left) => wanted.min(left),
            None => wanted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_bounds() {
        assert!(validate_timeout_seconds(1).is_ok());
        assert!(validate_timeout_seconds(MAX_TIMEOUT_SECONDS).is_ok());
        assert!(matches!(
            validate_timeout_seconds(0),
            Err(TimeoutValidationError::OutOfBounds { .. })
        ));
        assert!(validate_timeout_seconds(MAX_TIMEOUT_SECONDS + 1).is_err());
    }

    #[test]
    fn test_unbounded_never_expires() {
        let start = Instant::now();
        let deadline = Deadline::unbounded(start);
        let later = start + Duration::from_secs(10 * 24 * 3600);

        assert_eq!(deadline.check(later), TimeoutStatus::Ok);
        assert_eq!(deadline.remaining(later), None);
        assert_eq!(deadline.clamp_sleep(later, Duration::from_secs(30)), Duration::from_secs(30));
    }

    #[test]
    fn test_bounded_expiry() {
        let start = Instant::now();
        let deadline = Deadline::new(start, Some(Duration::from_secs(10)));

        assert_eq!(deadline.check(start + Duration::from_secs(9)), TimeoutStatus::Ok);
        assert!(deadline.check(start + Duration::from_secs(10)).is_timeout());
        assert_eq!(
            deadline.remaining(start + Duration::from_secs(4)),
            Some(Duration::from_secs(6))
        );
    }

    #[test]
    fn test_clamp_sleep_to_remaining() {
        let start = Instant::now();
        let deadline = Deadline::new(start, Some(Duration::from_secs(10)));
        let now = start + Duration::from_secs(8);

        assert_eq!(deadline.clamp_sleep(now, Duration::from_secs(30)), Duration::from_secs(2));
        assert_eq!(deadline.clamp_sleep(now, Duration::from_secs(1)), Duration::from_secs(1));
    }
}
