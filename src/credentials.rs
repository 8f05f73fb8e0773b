//! API credentials
//!
//! `credentials.json` holds the bearer token and, optionally, when it
//! expires:
//!
//! ```json
//! {"token": "…", "expires_at": "2026-12-31T00:00:00Z"}
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("failed to read credentials file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse credentials file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Couldn't log in: credentials file has an empty token")]
    EmptyToken,

    #[error("Couldn't log in: token expired at {0}")]
    Expired(DateTime<Utc>),
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self, CredentialsError> {
        let content = fs::read_to_string(path).map_err(|source| CredentialsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let credentials: Credentials =
            serde_json::from_str(&content).map_err(|source| CredentialsError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        credentials.validate(Utc::now())?;
        Ok(credentials)
    }

    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), CredentialsError> {
        if self.token.trim().is_empty() {
            return Err(CredentialsError::EmptyToken);
        }
        match self.expires_at {
            Some(expiry) if expiry <= now => Err(CredentialsError::Expired(expiry)),
            _ => Ok(()),
        }
    }

    pub fn token(&self) -> &str {
        self.token.trim()
    }
}
