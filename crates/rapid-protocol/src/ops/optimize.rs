//! Optimization job types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::JobId;

/// Response of `POST rawmodel/optimize/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeResponse {
    /// Rapid model id of the queued optimization.
    pub id: JobId,
}

/// The parts of a finished `rapidmodel/{id}` status we consume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub downloads: Downloads,
}

/// Download links of a finished optimization.
///
/// `all` holds one entry per configured file export, in export order.
/// Per-extension lists exist too but are not needed for naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Downloads {
    #[serde(default)]
    pub all: Map<String, Value>,
}

impl Downloads {
    /// `(key, url)` pairs in server order. Non-string values are skipped.
    pub fn urls(&self) -> Vec<(&str, &str)> {
        self.all
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|url| (k.as_str(), url)))
            .collect()
    }
}

impl OptimizationResult {
    pub fn from_data(data: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_downloads_keep_server_order() {
        let data = json!({
            "optimization_status": "done",
            "downloads": {
                "all": {"z-glb": "https://dl/1", "a-usdz": "https://dl/2", "m": null},
                "glb": "https://dl/1"
            }
        });
        let result = OptimizationResult::from_data(&data).unwrap();
        assert_eq!(
            result.downloads.urls(),
            vec![("z-glb", "https://dl/1"), ("a-usdz", "https://dl/2")]
        );
    }

    #[test]
    fn test_missing_downloads_is_error() {
        assert!(OptimizationResult::from_data(&json!({"optimization_status": "done"})).is_err());
    }
}
