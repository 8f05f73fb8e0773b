//! Command workflows
//!
//! Each `run_*` function implements one subcommand on top of a
//! [`Session`]: the API client, the poller sharing the client as its status
//! transport, and the resolved settings.

pub mod cleanup;
pub mod inputs;
pub mod optimize;
pub mod preset;
pub mod upload;
pub mod validate;
pub mod wait;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rapid_protocol::JobId;
use serde_json::Value;

use crate::cancel::CancelToken;
use crate::config::{ConfigError, Settings};
use crate::credentials::CredentialsError;
use crate::host::{ApiClient, ApiClientConfig, ApiError};
use crate::poll::{Clock, JobHandle, JobPoller, PollError, PollOptions, ProgressObserver, StatusRule};
use crate::summary::ExitCode;
use crate::variants::{SchemaError, VariantsError};

pub use cleanup::cleanup_model;
pub use inputs::{resolve_inputs, InputMode, ModelInput};
pub use optimize::{produce_variant, run_optimize, OptimizeRequest};
pub use preset::{run_preset, PresetRequest};
pub use upload::upload_model;
pub use validate::{run_validate, VariantCheck};
pub use wait::{run_wait, WaitRequest};

const REPORT_RULE: &str = "******************************************************";

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Variants(#[from] VariantsError),

    #[error("Unable to validate configuration against schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("invalid model input {path}: {reason}")]
    Input { path: PathBuf, reason: String },

    #[error("{stage}: {source}")]
    Api {
        stage: &'static str,
        #[source]
        source: ApiError,
    },

    #[error("Couldn't obtain signed upload URLs from server: no URL for {0}")]
    MissingUploadUrl(String),

    #[error("{stage}: {source}")]
    Poll {
        stage: &'static str,
        #[source]
        source: PollError,
    },

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("optimization result unreadable: {0}")]
    Result(String),

    #[error("Exiting with error because of failed variants conversion")]
    PresetFailed,

    #[error("cancelled")]
    Cancelled,
}

impl WorkflowError {
    pub fn api(stage: &'static str) -> impl FnOnce(ApiError) -> WorkflowError {
        move |source| WorkflowError::Api { stage, source }
    }

    /// Map a poll failure; cancellation keeps its own variant.
    pub fn poll(stage: &'static str) -> impl FnOnce(PollError) -> WorkflowError {
        move |source| match source {
            PollError::Cancelled => WorkflowError::Cancelled,
            source => WorkflowError::Poll { stage, source },
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        match self {
            WorkflowError::Cancelled => ExitCode::Cancelled,
            _ => ExitCode::Fatal,
        }
    }
}

/// Print the server's error message and reported errors, if any.
pub fn report_api_error(error: &ApiError) {
    println!("{REPORT_RULE}");
    match error {
        ApiError::Server {
            status,
            message,
            errors,
            ..
        } => {
            println!("ERROR: The server couldn't fulfill the request.");
            println!("Error code: {status}");
            println!("Server message: \"{message}\"");
            if let Some(errors) = errors {
                println!("Reported Errors:");
                println!(
                    "{}",
                    serde_json::to_string_pretty(errors).unwrap_or_else(|_| errors.to_string())
                );
            }
        }
        other => {
            println!("ERROR: Failed to fulfill the request.");
            println!("Reason: {other}");
        }
    }
    println!("{REPORT_RULE}");
}

/// API client, poller and settings for one command.
pub struct Session {
    pub client: Arc<ApiClient>,
    pub poller: JobPoller,
    pub settings: Settings,
}

impl Session {
    pub fn new(settings: Settings, token: &str, cancel: CancelToken) -> Result<Self, WorkflowError> {
        let config = ApiClientConfig::new(settings.base_url.clone())
            .with_request_timeout(Duration::from_secs(settings.http.request_timeout_seconds));
        let client = Arc::new(ApiClient::new(config, token).map_err(WorkflowError::api("HTTP client"))?);
        let poller = JobPoller::new(client.clone(), token)
            .with_cancel(cancel)
            .with_rate_limit_delay(Duration::from_secs(settings.poll.rate_limit_delay_seconds));
        Ok(Self {
            client,
            poller,
            settings,
        })
    }

    /// Replace the poller's clock (tests drive polling with virtual time).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.poller = self.poller.with_clock(clock);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.poller.cancel_token().is_cancelled()
    }

    fn deadline(&self) -> Option<Duration> {
        self.settings.poll.timeout_seconds.map(Duration::from_secs)
    }

    pub fn upload_poll_options(&self) -> PollOptions {
        PollOptions::every(Duration::from_secs(self.settings.poll.upload_interval_seconds))
            .with_deadline(self.deadline())
    }

    pub fn optimization_poll_options(&self) -> PollOptions {
        PollOptions::every(Duration::from_secs(self.settings.poll.optimization_interval_seconds))
            .with_deadline(self.deadline())
    }

    pub fn base_asset_handle(&self, id: &JobId, rule: StatusRule) -> JobHandle {
        let url = self.client.url(&rapid_protocol::endpoints::base_asset(id));
        JobHandle::new(id.clone(), url, rule)
    }

    pub fn rapid_model_handle(&self, id: &JobId) -> JobHandle {
        let url = self.client.url(&rapid_protocol::endpoints::rapid_model(id));
        let rule = StatusRule::optimization(self.settings.poll.optimization_pending.clone());
        JobHandle::new(id.clone(), url, rule)
    }

    /// Poll an optimization job until it is done.
    pub fn wait_for_optimization(
        &self,
        id: &JobId,
        observer: &mut dyn ProgressObserver,
    ) -> Result<Value, PollError> {
        let handle = self.rapid_model_handle(id);
        self.poller
            .poll_until_complete(&handle, &self.optimization_poll_options(), observer)
    }
}
