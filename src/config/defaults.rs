//! Built-in defaults (layer 1)

use rapid_protocol::{status, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fully resolved settings after all layers are merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// API base URL
    pub base_url: String,

    /// Credentials JSON file (`{"token": ...}`)
    pub credentials_file: PathBuf,

    /// Variant definitions JSON file
    pub variants_file: PathBuf,

    /// JSON Schema the variant configs are validated against
    pub schema_file: PathBuf,

    /// Directory downloads and presets are written to
    pub output_dir: PathBuf,

    pub http: HttpSettings,

    pub poll: PollSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Per-request timeout (default: 300, uploads can be large)
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Interval between upload status queries (default: 1)
    pub upload_interval_seconds: u64,

    /// Interval between optimization status queries (default: 2)
    pub optimization_interval_seconds: u64,

    /// Delay after an HTTP 429 (default: 30)
    pub rate_limit_delay_seconds: u64,

    /// Upper bound for a single poll; unbounded when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    /// Statuses that keep the upload analysis poll going
    pub upload_pending: Vec<String>,

    /// Statuses that keep the optimization poll going
    pub optimization_pending: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials_file: PathBuf::from("credentials.json"),
            variants_file: PathBuf::from("variants.json"),
            schema_file: PathBuf::from("schema/workflow_schema_v2_5.schema.json"),
            output_dir: PathBuf::from("output"),
            http: HttpSettings {
                request_timeout_seconds: 300,
            },
            poll: PollSettings {
                upload_interval_seconds: 1,
                optimization_interval_seconds: 2,
                rate_limit_delay_seconds: 30,
                timeout_seconds: None,
                upload_pending: vec![
                    status::UPLOADING.to_string(),
                    status::UNZIPPING.to_string(),
                    status::PROCESSING.to_string(),
                ],
                optimization_pending: vec![status::SENT_TO_QUEUE.to_string()],
            },
        }
    }
}

impl Settings {
    /// Built-in defaults as a JSON value for merging.
    pub fn defaults_value() -> serde_json::Value {
        // Settings only holds strings, integers and lists.
        serde_json::to_value(Settings::default()).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.base_url, "https://api.rapidcompact.com/api/");
        assert_eq!(settings.poll.upload_interval_seconds, 1);
        assert_eq!(settings.poll.optimization_interval_seconds, 2);
        assert_eq!(settings.poll.rate_limit_delay_seconds, 30);
        assert!(settings.poll.timeout_seconds.is_none());
        assert_eq!(settings.poll.optimization_pending, vec!["sent_to_queue"]);
    }

    #[test]
    fn test_defaults_value_shape() {
        let value = Settings::defaults_value();
        assert_eq!(value["poll"]["rate_limit_delay_seconds"], 30);
        assert_eq!(value["output_dir"], "output");
        assert!(value["poll"].get("timeout_seconds").is_none());
    }
}
