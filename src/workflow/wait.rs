//! `wait`: resume polling an optimization that is already queued.

use std::str::FromStr;

use rapid_protocol::JobId;

use super::optimize::download_results;
use super::{Session, WorkflowError};
use crate::poll::TerminalProgress;
use crate::summary::{Status, VariantRecord};
use crate::variants::{Variant, VariantsFile};

#[derive(Debug, Clone)]
pub struct WaitRequest {
    pub rapid_model_id: String,
    /// Variant the job was created from; names outputs and maps file types
    pub variant: Option<String>,
    /// Output file prefix
    pub label: String,
    pub extract: bool,
}

/// Poll `rapid_model_id` to completion and download its results.
pub fn run_wait(session: &Session, request: &WaitRequest) -> Result<VariantRecord, WorkflowError> {
    let id = JobId::from_str(&request.rapid_model_id).map_err(|e| WorkflowError::Input {
        path: request.rapid_model_id.clone().into(),
        reason: e.to_string(),
    })?;

    let variant = match &request.variant {
        Some(name) => {
            let variants = VariantsFile::load(&session.settings.variants_file)?;
            variants.get(name).cloned().ok_or_else(|| WorkflowError::Input {
                path: session.settings.variants_file.clone(),
                reason: format!("no variant named \"{name}\""),
            })?
        }
        // unknown file types are saved with a generic extension
        None => Variant::new(id.to_string(), serde_json::Value::Null),
    };

    println!("Waiting for optimized model {id} ...");
    let mut progress = TerminalProgress::stdout();
    let payload = session
        .wait_for_optimization(&id, &mut progress)
        .map_err(|e| {
            progress.abandon();
            WorkflowError::poll("Optimization failed")(e)
        })?;

    let (outputs, download_errors) = download_results(session, &payload, &request.label, &variant, request.extract)
        .map_err(WorkflowError::Result)?;

    let mut record = VariantRecord::new(&variant.name, Status::Success).with_rapid_model_id(id);
    record.outputs = outputs;
    record.download_errors = download_errors;
    Ok(record)
}
