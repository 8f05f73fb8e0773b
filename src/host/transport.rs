//! Status transport
//!
//! Abstracts the status query for testability:
//! - StatusTransport: one GET against a job's status URL
//! - ScriptedTransport: replays canned replies in-process for tests
//! - ApiClient (in `client`) implements it over HTTP for production

use std::collections::VecDeque;
use std::sync::Mutex;

/// Raw reply to a status query. Classification happens in the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReply {
    pub http_status: u16,
    pub body: String,
}

impl StatusReply {
    pub fn new(http_status: u16, body: impl Into<String>) -> Self {
        Self {
            http_status,
            body: body.into(),
        }
    }

    /// 200 with a JSON body.
    pub fn json(body: &serde_json::Value) -> Self {
        Self::new(200, body.to_string())
    }

    pub fn rate_limited() -> Self {
        Self::new(429, "")
    }
}

/// Transport-level failures: nothing usable came back from the server.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timed out")]
    Timeout,

    #[error("failed to read response: {0}")]
    Body(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::ConnectionFailed(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else {
            TransportError::Client(err.to_string())
        }
    }
}

/// One authenticated status query.
pub trait StatusTransport: Send + Sync {
    fn fetch_status(&self, url: &str, token: &str) -> Result<StatusReply, TransportError>;
}

/// A status query as seen by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedQuery {
    pub url: String,
    pub token: String,
}

/// Replays scripted replies in order; fails with a connection error once
/// the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<StatusReply, TransportError>>>,
    queries: Mutex<Vec<RecordedQuery>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: StatusReply) -> &Self {
        self.lock_replies().push_back(Ok(reply));
        self
    }

    pub fn push_json(&self, body: serde_json::Value) -> &Self {
        self.push(StatusReply::json(&body))
    }

    pub fn push_error(&self, error: TransportError) -> &Self {
        self.lock_replies().push_back(Err(error));
        self
    }

    /// Queries received so far
    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().map(|q| q.len()).unwrap_or(0)
    }

    /// Replies not yet consumed
    pub fn remaining(&self) -> usize {
        self.lock_replies().len()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<StatusReply, TransportError>>> {
        self.replies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StatusTransport for ScriptedTransport {
    fn fetch_status(&self, url: &str, token: &str) -> Result<StatusReply, TransportError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(RecordedQuery {
                url: url.to_string(),
                token: token.to_string(),
            });
        }
        self.lock_replies().pop_front().unwrap_or_else(|| {
            Err(TransportError::ConnectionFailed(
                "no scripted reply left".to_string(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scripted_replays_in_order() {
        let transport = ScriptedTransport::new();
        transport
            .push_json(json!({"data": {"upload_status": "unzipping"}}))
            .push(StatusReply::rate_limited());

        let first = transport.fetch_status("http://x/rawmodel/1", "tok").unwrap();
        assert_eq!(first.http_status, 200);
        assert!(first.body.contains("unzipping"));

        let second = transport.fetch_status("http://x/rawmodel/1", "tok").unwrap();
        assert_eq!(second.http_status, 429);

        assert_eq!(transport.query_count(), 2);
        assert_eq!(transport.queries()[0].token, "tok");
    }

    #[test]
    fn test_exhausted_script_is_connection_failure() {
        let transport = ScriptedTransport::new();
        let err = transport.fetch_status("http://x", "t").unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed(_)));
    }

    #[test]
    fn test_scripted_error() {
        let transport = ScriptedTransport::new();
        transport.push_error(TransportError::Timeout);
        assert!(matches!(
            transport.fetch_status("http://x", "t"),
            Err(TransportError::Timeout)
        ));
        assert_eq!(transport.remaining(), 0);
    }
}
