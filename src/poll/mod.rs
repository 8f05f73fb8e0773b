//! Long-poll job completion
//!
//! Drives a remote job from pending to a terminal state:
//! Pending → {Done | Failed}
//!
//! Each iteration issues one status query and classifies the reply:
//! - HTTP 429: sleep the rate-limit delay and ask again
//! - transport error, non-2xx, or unparseable body: `Communication`, no retry
//! - terminal status: `Done` with the `data` object as payload
//! - allow-listed status: sleep the interval and ask again
//! - anything else: `UnexpectedStatus`, no retry
//!
//! Progress is an observation, not a transition. It is forwarded to a
//! [`ProgressObserver`] whenever a 2xx reply carries it.
//!
//! Polling is unbounded by default. Callers may bound it with a deadline
//! and stop it with a [`CancelToken`]; both are checked before every query
//! and sleeps are cut short by either.

pub mod clock;
pub mod progress;

use std::sync::Arc;
use std::time::Duration;

use rapid_protocol::{fields, status, ApiErrorBody, JobId, StatusEnvelope};
use serde_json::Value;

use crate::cancel::CancelToken;
use crate::host::transport::{StatusReply, StatusTransport};
use crate::timeout::Deadline;

pub use clock::{Clock, ManualClock, SystemClock};
pub use progress::{
    render_bar, render_finished, render_line, NoProgress, ProgressObserver, RecordingProgress,
    TerminalProgress,
};

/// Fixed backoff after HTTP 429.
pub const RATE_LIMIT_DELAY: Duration = Duration::from_secs(30);

/// When a job counts as finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// The status field equals this value.
    Status(String),
    /// Any value outside the pending list. Used for the unzip phase, which
    /// only waits for `unzipping` to end.
    LeavesPending,
}

/// How to read a job's status field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRule {
    pub field: String,
    pub pending: Vec<String>,
    pub terminal: Terminal,
}

/// Where a status value falls under a [`StatusRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Terminal,
    Pending,
    Unexpected,
}

impl StatusRule {
    pub fn new(field: impl Into<String>, pending: Vec<String>, terminal: Terminal) -> Self {
        Self {
            field: field.into(),
            pending,
            terminal,
        }
    }

    /// First phase of a zip upload: wait until the archive is unpacked.
    pub fn unzip_phase() -> Self {
        Self::new(
            fields::UPLOAD_STATUS,
            vec![status::UNZIPPING.to_string()],
            Terminal::LeavesPending,
        )
    }

    /// Upload analysis: wait for `complete`.
    pub fn upload_analysis(pending: Vec<String>) -> Self {
        Self::new(
            fields::UPLOAD_STATUS,
            pending,
            Terminal::Status(status::COMPLETE.to_string()),
        )
    }

    /// Optimization job: wait for `done`.
    pub fn optimization(pending: Vec<String>) -> Self {
        Self::new(
            fields::OPTIMIZATION_STATUS,
            pending,
            Terminal::Status(status::DONE.to_string()),
        )
    }

    fn is_pending(&self, value: &str) -> bool {
        self.pending.iter().any(|p| p == value)
    }

    pub fn classify_status(&self, value: &str) -> StatusClass {
        match &self.terminal {
            Terminal::Status(done) if done == value => StatusClass::Terminal,
            _ if self.is_pending(value) => StatusClass::Pending,
            Terminal::LeavesPending => StatusClass::Terminal,
            Terminal::Status(_) => StatusClass::Unexpected,
        }
    }
}

/// A remote job being waited on.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub id: JobId,
    pub status_url: String,
    pub rule: StatusRule,
}

impl JobHandle {
    pub fn new(id: JobId, status_url: impl Into<String>, rule: StatusRule) -> Self {
        Self {
            id,
            status_url: status_url.into(),
            rule,
        }
    }
}

/// Progress carried by one status reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    pub percent: u8,
    pub step: Option<String>,
}

/// Polling failures. None of them is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("communication error: {0}")]
    Communication(String),

    #[error("unexpected status `{0}`")]
    UnexpectedStatus(String),

    #[error("polling cancelled")]
    Cancelled,

    #[error("gave up after {waited:?} without a terminal status")]
    DeadlineExceeded { waited: Duration },
}

/// Outcome of one status query.
#[derive(Debug, Clone, PartialEq)]
pub enum PollResult {
    Pending {
        status: String,
        progress: Option<ProgressReport>,
    },
    RateLimited,
    Done {
        payload: Value,
        progress: Option<ProgressReport>,
    },
    Failed {
        error: PollError,
        progress: Option<ProgressReport>,
    },
}

impl PollResult {
    fn failed(error: PollError) -> Self {
        PollResult::Failed {
            error,
            progress: None,
        }
    }

    pub fn progress(&self) -> Option<&ProgressReport> {
        match self {
            PollResult::Pending { progress, .. }
            | PollResult::Done { progress, .. }
            | PollResult::Failed { progress, .. } => progress.as_ref(),
            PollResult::RateLimited => None,
        }
    }

    /// State of the job after this observation.
    pub fn state(&self) -> PollState {
        match self {
            PollResult::Pending { .. } | PollResult::RateLimited => PollState::Pending,
            PollResult::Done { .. } => PollState::Done,
            PollResult::Failed { .. } => PollState::Failed,
        }
    }
}

/// Job state as seen by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Pending,
    Done,
    Failed,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PollState::Done | PollState::Failed)
    }

    /// Terminal states are final; a job never re-enters pending.
    pub fn can_transition_to(&self, target: PollState) -> bool {
        matches!(self, PollState::Pending)
            && matches!(target, PollState::Pending | PollState::Done | PollState::Failed)
    }
}

/// Classify one raw status reply. Pure; does no I/O.
pub fn classify(reply: &StatusReply, rule: &StatusRule) -> PollResult {
    if reply.http_status == 429 {
        return PollResult::RateLimited;
    }
    if !(200..300).contains(&reply.http_status) {
        let detail = match ApiErrorBody::parse(&reply.body) {
            Some(body) => body.message,
            None => reply.body.trim().chars().take(200).collect(),
        };
        return PollResult::failed(PollError::Communication(format!(
            "HTTP {}: {}",
            reply.http_status, detail
        )));
    }

    let envelope: StatusEnvelope = match serde_json::from_str(&reply.body) {
        Ok(envelope) => envelope,
        Err(e) => {
            return PollResult::failed(PollError::Communication(format!(
                "invalid status response: {e}"
            )))
        }
    };

    let progress = envelope.progress().map(|percent| ProgressReport {
        percent,
        step: envelope.processing_step().map(str::to_string),
    });

    let Some(value) = envelope.status(&rule.field).map(str::to_string) else {
        return PollResult::Failed {
            error: PollError::Communication(format!(
                "status response has no `{}` field",
                rule.field
            )),
            progress,
        };
    };

    match rule.classify_status(&value) {
        StatusClass::Terminal => PollResult::Done {
            payload: envelope.into_data(),
            progress,
        },
        StatusClass::Pending => PollResult::Pending {
            status: value,
            progress,
        },
        StatusClass::Unexpected => PollResult::Failed {
            error: PollError::UnexpectedStatus(value),
            progress,
        },
    }
}

/// Per-call polling parameters.
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    /// Sleep between queries while pending.
    pub interval: Duration,
    /// Optional bound on total wait time.
    pub deadline: Option<Duration>,
}

impl PollOptions {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Blocking job poller.
pub struct JobPoller {
    transport: Arc<dyn StatusTransport>,
    clock: Arc<dyn Clock>,
    token: String,
    cancel: CancelToken,
    rate_limit_delay: Duration,
}

impl JobPoller {
    pub fn new(transport: Arc<dyn StatusTransport>, token: impl Into<String>) -> Self {
        Self {
            transport,
            clock: Arc::new(SystemClock),
            token: token.into(),
            cancel: CancelToken::new(),
            rate_limit_delay: RATE_LIMIT_DELAY,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Query once and classify.
    pub fn poll_once(&self, handle: &JobHandle) -> PollResult {
        match self.transport.fetch_status(&handle.status_url, &self.token) {
            Ok(reply) => classify(&reply, &handle.rule),
            Err(e) => PollResult::failed(PollError::Communication(e.to_string())),
        }
    }

    /// Block until the job reaches its terminal status.
    ///
    /// Returns the `data` object of the final reply.
    pub fn poll_until_complete(
        &self,
        handle: &JobHandle,
        options: &PollOptions,
        observer: &mut dyn ProgressObserver,
    ) -> Result<Value, PollError> {
        let deadline = Deadline::new(self.clock.now(), options.deadline);
        let mut attempt: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(PollError::Cancelled);
            }
            let now = self.clock.now();
            if deadline.check(now).is_timeout() {
                return Err(PollError::DeadlineExceeded {
                    waited: deadline.elapsed(now),
                });
            }

            attempt += 1;
            let result = self.poll_once(handle);
            if let Some(report) = result.progress() {
                observer.on_progress(report.percent, report.step.as_deref());
            }

            match result {
                PollResult::RateLimited => {
                    tracing::debug!(job = %handle.id, attempt, "rate limited, backing off");
                    self.sleep(&deadline, self.rate_limit_delay);
                }
                PollResult::Pending { status, .. } => {
                    tracing::debug!(job = %handle.id, attempt, %status, "job pending");
                    self.sleep(&deadline, options.interval);
                }
                PollResult::Done { payload, .. } => {
                    tracing::debug!(job = %handle.id, attempt, "job done");
                    observer.on_complete(&payload);
                    return Ok(payload);
                }
                PollResult::Failed { error, .. } => {
                    tracing::debug!(job = %handle.id, attempt, %error, "job poll failed");
                    return Err(error);
                }
            }
        }
    }

    fn sleep(&self, deadline: &Deadline, wanted: Duration) {
        let wait = deadline.clamp_sleep(self.clock.now(), wanted);
        self.clock.sleep(wait, &self.cancel);
    }
}
