//! RapidCompact Protocol Types
//!
//! Request/response bodies exchanged with the RapidCompact REST API and the
//! endpoint paths they are sent to.

pub mod endpoints;
pub mod error;
pub mod job_id;
pub mod ops;

pub use error::ApiErrorBody;
pub use job_id::{JobId, JobIdParseError};
pub use ops::{
    Downloads, OptimizationResult, OptimizeResponse, StatusEnvelope, UploadLinks,
    UploadStartRequest, UploadStartResponse,
};

/// Default API base URL. Always ends with a slash.
pub const DEFAULT_BASE_URL: &str = "https://api.rapidcompact.com/api/";

/// Status field names reported in the `data` object of status responses.
pub mod fields {
    pub const UPLOAD_STATUS: &str = "upload_status";
    pub const OPTIMIZATION_STATUS: &str = "optimization_status";
    pub const PROGRESS: &str = "progress";
    pub const PROCESSING_STEP: &str = "processing_step";
}

/// Known status values.
pub mod status {
    pub const UNZIPPING: &str = "unzipping";
    pub const UPLOADING: &str = "uploading";
    pub const PROCESSING: &str = "processing";
    pub const COMPLETE: &str = "complete";
    pub const SENT_TO_QUEUE: &str = "sent_to_queue";
    pub const DONE: &str = "done";
}
