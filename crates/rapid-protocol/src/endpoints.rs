//! Endpoint paths, relative to the API base URL.

use crate::JobId;

pub const UPLOAD_START: &str = "rawmodel/api-upload/start";
pub const CONVERT_PRESET: &str = "preset/rpdx";

/// `rawmodel/{id}/api-upload/complete`
pub fn finalize_upload(id: &JobId) -> String {
    format!("rawmodel/{}/api-upload/complete", id)
}

/// `rawmodel/optimize/{id}`
pub fn optimize(base_asset_id: &JobId) -> String {
    format!("rawmodel/optimize/{}", base_asset_id)
}

/// `rawmodel/{id}`: base asset status and deletion.
pub fn base_asset(id: &JobId) -> String {
    format!("rawmodel/{}", id)
}

/// `rapidmodel/{id}`: optimization status and deletion.
pub fn rapid_model(id: &JobId) -> String {
    format!("rapidmodel/{}", id)
}

/// Join an endpoint path onto a base URL.
///
/// The base URL may or may not carry a trailing slash.
pub fn join(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let id = JobId::Number(42);
        assert_eq!(finalize_upload(&id), "rawmodel/42/api-upload/complete");
        assert_eq!(optimize(&id), "rawmodel/optimize/42");
        assert_eq!(base_asset(&id), "rawmodel/42");
        assert_eq!(rapid_model(&JobId::Text("abc".into())), "rapidmodel/abc");
    }

    #[test]
    fn test_join_slashes() {
        assert_eq!(
            join("https://api.rapidcompact.com/api/", UPLOAD_START),
            "https://api.rapidcompact.com/api/rawmodel/api-upload/start"
        );
        assert_eq!(join("http://localhost:1234", "/rapidmodel/1"), "http://localhost:1234/rapidmodel/1");
    }
}
