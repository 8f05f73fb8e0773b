//! Operation-specific types.

pub mod optimize;
pub mod status;
pub mod upload;

pub use optimize::{Downloads, OptimizationResult, OptimizeResponse};
pub use status::StatusEnvelope;
pub use upload::{UploadLinks, UploadStartRequest, UploadStartResponse};
