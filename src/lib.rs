//! RapidCompact command-line client
//!
//! Uploads 3D models to the RapidCompact cloud service, submits optimization
//! variants, long-polls the jobs to completion and downloads the results.
//! Also converts variant definitions into CLI preset packages.

pub mod artifact;
pub mod cancel;
pub mod config;
pub mod credentials;
pub mod host;
pub mod poll;
pub mod signal;
pub mod summary;
pub mod timeout;
pub mod variants;
pub mod workflow;

pub use cancel::CancelToken;
pub use config::{EffectiveConfig, Settings};
pub use credentials::Credentials;
pub use host::{ApiClient, ApiClientConfig, ApiError, StatusTransport};
pub use poll::{JobHandle, JobPoller, PollError, PollOptions, PollResult, StatusRule};
pub use summary::{ExitCode, RunSummary};
pub use workflow::{Session, WorkflowError};
