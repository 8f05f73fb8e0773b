//! Host-side API access
//!
//! `client` talks to the RapidCompact REST API; `transport` is the status
//! query seam the poller depends on.

pub mod client;
pub mod transport;

pub use client::{ApiClient, ApiClientConfig, ApiError, ApiResult};
pub use transport::{RecordedQuery, ScriptedTransport, StatusReply, StatusTransport, TransportError};
