//! Failure taxonomy and stable exit codes

use serde::{Deserialize, Serialize};

/// Variant/run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Optimization finished and outputs were downloaded
    Success,
    /// Submission or polling failed
    Failed,
    /// Variant was not submitted (schema or content check failed)
    Skipped,
    /// Interrupted by Ctrl-C
    Cancelled,
}

impl Status {
    /// Whether this status counts toward the failed-optimization total
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Failed)
    }
}

/// Why a variant failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// The optimize request was refused
    Submission,
    /// The status poll failed or reported an unexpected status
    Polling,
    /// The poll deadline passed
    Timeout,
    /// The job finished but its result could not be read
    Result,
    /// Polling was interrupted
    Cancelled,
}

impl FailureKind {
    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            FailureKind::Submission => "Optimization request rejected",
            FailureKind::Polling => "Optimization status polling failed",
            FailureKind::Timeout => "Optimization did not finish in time",
            FailureKind::Result => "Optimization result unreadable",
            FailureKind::Cancelled => "Optimization polling cancelled",
        }
    }
}

/// Stable process exit codes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ExitCode {
    /// Everything requested was done
    #[default]
    Success = 0,
    /// Credentials, variants, upload or preset failure
    Fatal = 1,
    /// At least one optimization failed and `--exit-on-error` was set
    OptimizationFailed = 42,
    /// Interrupted by Ctrl-C
    Cancelled = 80,
}

impl ExitCode {
    /// Get the integer value of the exit code
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Create from integer value
    pub fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExitCode::Success),
            1 => Some(ExitCode::Fatal),
            42 => Some(ExitCode::OptimizationFailed),
            80 => Some(ExitCode::Cancelled),
            _ => None,
        }
    }
}

/// Folds variant statuses into a run status and exit code
#[derive(Debug, Default)]
pub struct ExitCodeAggregator {
    has_cancelled: bool,
    failed: usize,
}

impl ExitCodeAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, status: Status) {
        if status == Status::Cancelled {
            self.has_cancelled = true;
        } else if status.is_failure() {
            self.failed += 1;
        }
    }

    pub fn failed_count(&self) -> usize {
        self.failed
    }

    /// Cancellation wins over failure; skipped variants never fail a run.
    pub fn status(&self) -> Status {
        if self.has_cancelled {
            Status::Cancelled
        } else if self.failed > 0 {
            Status::Failed
        } else {
            Status::Success
        }
    }

    /// Failed optimizations only change the exit code with `--exit-on-error`.
    pub fn exit_code(&self, exit_on_error: bool) -> ExitCode {
        if self.has_cancelled {
            ExitCode::Cancelled
        } else if self.failed > 0 && exit_on_error {
            ExitCode::OptimizationFailed
        } else {
            ExitCode::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&Status::Success).unwrap(), r#""success""#);
        assert_eq!(serde_json::to_string(&Status::Skipped).unwrap(), r#""skipped""#);
        assert_eq!(serde_json::to_string(&FailureKind::Timeout).unwrap(), r#""TIMEOUT""#);
    }

    #[test]
    fn test_only_failed_counts_as_failure() {
        assert!(Status::Failed.is_failure());
        assert!(!Status::Skipped.is_failure());
        assert!(!Status::Cancelled.is_failure());
        assert_eq!(FailureKind::Timeout.description(), "Optimization did not finish in time");
    }

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::Fatal.as_i32(), 1);
        assert_eq!(ExitCode::OptimizationFailed.as_i32(), 42);
        assert_eq!(ExitCode::Cancelled.as_i32(), 80);
        assert_eq!(ExitCode::from_i32(42), Some(ExitCode::OptimizationFailed));
        assert_eq!(ExitCode::from_i32(7), None);
    }

    #[test]
    fn test_aggregator_skipped_is_not_failure() {
        let mut agg = ExitCodeAggregator::new();
        agg.add(Status::Success);
        agg.add(Status::Skipped);
        assert_eq!(agg.status(), Status::Success);
        assert_eq!(agg.exit_code(true), ExitCode::Success);
    }

    #[test]
    fn test_aggregator_failure_needs_exit_on_error() {
        let mut agg = ExitCodeAggregator::new();
        agg.add(Status::Success);
        agg.add(Status::Failed);
        agg.add(Status::Failed);
        assert_eq!(agg.failed_count(), 2);
        assert_eq!(agg.status(), Status::Failed);
        assert_eq!(agg.exit_code(false), ExitCode::Success);
        assert_eq!(agg.exit_code(true), ExitCode::OptimizationFailed);
    }

    #[test]
    fn test_aggregator_cancelled_over_failed() {
        let mut agg = ExitCodeAggregator::new();
        agg.add(Status::Failed);
        agg.add(Status::Cancelled);
        assert_eq!(agg.status(), Status::Cancelled);
        assert_eq!(agg.exit_code(false), ExitCode::Cancelled);
    }
}
