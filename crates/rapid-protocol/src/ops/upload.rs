//! Raw model upload types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::JobId;

/// Body of `POST rawmodel/api-upload/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStartRequest {
    /// Names of the files that will be uploaded, e.g. `rapid.glb`.
    pub filenames: Vec<String>,
    /// Label shown for the base asset.
    pub model_name: String,
}

impl UploadStartRequest {
    /// Single-file upload. The server expects the file to be named `rapid.<ext>`.
    pub fn single(extension: &str, model_name: impl Into<String>) -> Self {
        Self {
            filenames: vec![upload_filename(extension)],
            model_name: model_name.into(),
        }
    }
}

/// Name under which a model with the given extension is uploaded.
pub fn upload_filename(extension: &str) -> String {
    format!("rapid.{}", extension.trim_start_matches('.'))
}

/// Response of `POST rawmodel/api-upload/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStartResponse {
    /// Base asset id.
    pub id: JobId,
    pub links: UploadLinks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadLinks {
    /// Presigned PUT URL per requested filename.
    pub s3_upload_urls: BTreeMap<String, String>,
}

impl UploadStartResponse {
    pub fn upload_url(&self, filename: &str) -> Option<&str> {
        self.links.s3_upload_urls.get(filename).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_request() {
        let req = UploadStartRequest::single(".glb", "chair");
        assert_eq!(req.filenames, vec!["rapid.glb".to_string()]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model_name"], "chair");
    }

    #[test]
    fn test_response_upload_url() {
        let body = r#"{"id":991,"links":{"s3_upload_urls":{"rapid.zip":"https://s3/put?sig=1"}}}"#;
        let resp: UploadStartResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.id, JobId::Number(991));
        assert_eq!(resp.upload_url("rapid.zip"), Some("https://s3/put?sig=1"));
        assert_eq!(resp.upload_url("rapid.glb"), None);
    }
}
