//! RapidCompact API client
//!
//! Blocking HTTP client for the REST endpoints used by the upload,
//! optimization, cleanup and preset flows. Every authenticated request
//! carries `Authorization: Bearer <token>`; presigned upload and download
//! URLs are requested without it.

use std::io::Write;
use std::time::Duration;

use rapid_protocol::{
    endpoints, ApiErrorBody, JobId, OptimizeResponse, UploadStartRequest, UploadStartResponse,
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::transport::{StatusReply, StatusTransport, TransportError};

/// API client configuration
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL the endpoint paths are joined onto
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(300),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// API client errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{endpoint}: server returned HTTP {status}: {message}")]
    Server {
        endpoint: String,
        status: u16,
        message: String,
        errors: Option<Value>,
    },

    #[error("{endpoint}: unexpected response: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status reported by the server, if the request got that far
    pub fn http_status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Blocking RapidCompact API client
pub struct ApiClient {
    http: Client,
    config: ApiClientConfig,
    token: String,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig, token: impl Into<String>) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("rapidcompact-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(TransportError::from)?;
        Ok(Self {
            http,
            config,
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Absolute URL of an endpoint path
    pub fn url(&self, path: &str) -> String {
        endpoints::join(&self.config.base_url, path)
    }

    // === Upload ===

    /// Request presigned upload URLs for a new base asset
    pub fn start_upload(&self, request: &UploadStartRequest) -> ApiResult<UploadStartResponse> {
        let endpoint = endpoints::UPLOAD_START;
        let builder = self.authed(self.http.post(self.url(endpoint))).json(request);
        let response = self.send(builder, endpoint)?;
        self.read_json(response, endpoint)
    }

    /// PUT raw model bytes to a presigned URL
    pub fn put_upload(&self, presigned_url: &str, content: Vec<u8>) -> ApiResult<()> {
        let bytes = content.len();
        let builder = self.http.put(presigned_url).body(content);
        self.send(builder, "presigned upload")?;
        tracing::debug!(bytes, "model bytes uploaded");
        Ok(())
    }

    /// Tell the API the presigned upload has finished
    pub fn finalize_upload(&self, base_asset_id: &JobId) -> ApiResult<()> {
        let endpoint = endpoints::finalize_upload(base_asset_id);
        self.send(self.authed(self.http.get(self.url(&endpoint))), &endpoint)?;
        Ok(())
    }

    // === Optimization ===

    /// Queue an optimization of a base asset with the given variant definition
    pub fn submit_optimization(&self, base_asset_id: &JobId, variant: &Value) -> ApiResult<OptimizeResponse> {
        let endpoint = endpoints::optimize(base_asset_id);
        let builder = self.authed(self.http.post(self.url(&endpoint))).json(variant);
        let response = self.send(builder, &endpoint)?;
        self.read_json(response, &endpoint)
    }

    /// Stream a download URL into `out`, returning the byte count
    pub fn download_to<W: Write + ?Sized>(&self, url: &str, out: &mut W) -> ApiResult<u64> {
        let mut response = self.send(self.http.get(url), "download")?;
        let written = response.copy_to(out).map_err(TransportError::from)?;
        Ok(written)
    }

    // === Cleanup ===

    pub fn delete_base_asset(&self, id: &JobId) -> ApiResult<()> {
        self.delete(&endpoints::base_asset(id))
    }

    pub fn delete_rapid_model(&self, id: &JobId) -> ApiResult<()> {
        self.delete(&endpoints::rapid_model(id))
    }

    fn delete(&self, endpoint: &str) -> ApiResult<()> {
        let response = self.send(self.authed(self.http.delete(self.url(endpoint))), endpoint)?;
        expect_200(&response, endpoint)
    }

    // === Presets ===

    /// Convert a variant definition into a CLI preset package (zip bytes)
    pub fn convert_preset(&self, variant: &Value) -> ApiResult<Vec<u8>> {
        let endpoint = endpoints::CONVERT_PRESET;
        let builder = self.authed(self.http.post(self.url(endpoint))).json(variant);
        let response = self.send(builder, endpoint)?;
        expect_200(&response, endpoint)?;
        let bytes = response.bytes().map_err(TransportError::from)?;
        Ok(bytes.to_vec())
    }

    // === Helpers ===

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.token)
    }

    /// Send a request, mapping non-2xx answers to `ApiError::Server`.
    fn send(&self, builder: RequestBuilder, endpoint: &str) -> ApiResult<Response> {
        let response = builder.send().map_err(TransportError::from)?;
        let status = response.status();
        tracing::debug!(endpoint, status = status.as_u16(), "API response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let (message, errors) = match ApiErrorBody::parse(&body) {
            Some(parsed) => (parsed.message, parsed.errors),
            None if body.trim().is_empty() => (
                status.canonical_reason().unwrap_or("no reason given").to_string(),
                None,
            ),
            None => (body.trim().to_string(), None),
        };
        tracing::warn!(endpoint, status = status.as_u16(), %message, "API request failed");

        Err(ApiError::Server {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
            errors,
        })
    }

    fn read_json<T: DeserializeOwned>(&self, response: Response, endpoint: &str) -> ApiResult<T> {
        let body = response.text().map_err(TransportError::from)?;
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

fn expect_200(response: &Response, endpoint: &str) -> ApiResult<()> {
    if response.status() == StatusCode::OK {
        Ok(())
    } else {
        Err(ApiError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: format!("expected HTTP 200, got {}", response.status().as_u16()),
        })
    }
}

impl StatusTransport for ApiClient {
    fn fetch_status(&self, url: &str, token: &str) -> Result<StatusReply, TransportError> {
        let response = self.http.get(url).bearer_auth(token).send()?;
        let http_status = response.status().as_u16();
        let body = response.text()?;
        Ok(StatusReply { http_status, body })
    }
}
