//! Effective configuration with provenance
//!
//! Records the merged configuration and where each contributing layer came
//! from, then resolves it into typed [`Settings`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::defaults::Settings;
use super::merge::merge_layers;

/// Origin of a configuration layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    User,
    File,
    Cli,
}

/// A contributing config layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration plus the layers it was built from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// `$HOME/.config/rapidcompact/config.toml`, when HOME is set.
pub fn default_user_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".config/rapidcompact/config.toml"))
}

impl EffectiveConfig {
    /// Build from layers: builtin, user file, explicit file, CLI overrides.
    ///
    /// A missing user file is skipped; a missing explicit file is an error.
    pub fn build(
        user_config_path: Option<&Path>,
        config_path: Option<&Path>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = vec![Settings::defaults_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        if let Some(path) = user_config_path.filter(|p| p.exists()) {
            let (value, digest) = load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::User,
                path: Some(path.display().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(path) = config_path {
            let (value, digest) = load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin: ConfigOrigin::File,
                path: Some(path.display().to_string()),
                digest: Some(digest),
            });
        }

        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        Ok(Self {
            created_at: Utc::now(),
            config: merge_layers(layers),
            sources,
        })
    }

    /// Resolve into typed settings and check value bounds.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let settings: Settings = serde_json::from_value(self.config.clone())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        validate(&settings)?;
        Ok(settings)
    }

    /// Get a merged value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.config, |current, part| current.get(part))
    }
}

fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
    let bytes = fs::read(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let digest = hex::encode(Sha256::digest(&bytes));

    let contents = String::from_utf8(bytes).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!("invalid UTF-8: {}", e),
    })?;
    let value: toml::Value = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    Ok((toml_to_json(value), digest))
}

fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => {
            Value::Object(table.into_iter().map(|(k, v)| (k, toml_to_json(v))).collect())
        }
    }
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if !(settings.base_url.starts_with("http://") || settings.base_url.starts_with("https://")) {
        return Err(ConfigError::Invalid(format!(
            "base_url must be an http(s) URL, got '{}'",
            settings.base_url
        )));
    }

    let poll = &settings.poll;
    for (name, value) in [
        ("poll.upload_interval_seconds", poll.upload_interval_seconds),
        ("poll.optimization_interval_seconds", poll.optimization_interval_seconds),
        ("poll.rate_limit_delay_seconds", poll.rate_limit_delay_seconds),
    ] {
        if value == 0 || value > 3600 {
            return Err(ConfigError::Invalid(format!("{} must be in (0, 3600]", name)));
        }
    }

    if let Some(timeout) = poll.timeout_seconds {
        crate::timeout::validate_timeout_seconds(timeout)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    }

    let request_timeout = settings.http.request_timeout_seconds;
    if request_timeout == 0 || request_timeout > 3600 {
        return Err(ConfigError::Invalid(
            "http.request_timeout_seconds must be in (0, 3600]".to_string(),
        ));
    }

    if poll
        .upload_pending
        .iter()
        .chain(&poll.optimization_pending)
        .any(|s| s.trim().is_empty())
    {
        return Err(ConfigError::Invalid(
            "pending status lists must not contain empty values".to_string(),
        ));
    }

    Ok(())
}
