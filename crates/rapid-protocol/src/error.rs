//! Error bodies returned by the API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error body sent alongside non-2xx responses.
///
/// `errors` is free-form (usually a map of field name to messages).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl ApiErrorBody {
    /// Parse an error body, returning None when it is not the API's JSON shape.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(errors) = &self.errors {
            write!(f, " ({})", errors)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_errors() {
        let body = r#"{"message":"The given data was invalid.","errors":{"model_name":["required"]}}"#;
        let err = ApiErrorBody::parse(body).unwrap();
        assert_eq!(err.message, "The given data was invalid.");
        assert!(err.to_string().contains("model_name"));
    }

    #[test]
    fn test_parse_non_json() {
        assert!(ApiErrorBody::parse("<html>502 Bad Gateway</html>").is_none());
    }
}
