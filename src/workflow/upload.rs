//! Base asset upload
//!
//! start → PUT to the signed URL → finalize → (zip only) wait for unzip →
//! wait for analysis. Any failure aborts the command.

use std::fs;
use std::path::Path;

use rapid_protocol::ops::upload::upload_filename;
use rapid_protocol::{status, JobId, UploadStartRequest};

use super::{report_api_error, Session, WorkflowError};
use crate::poll::{NoProgress, StatusRule};

/// Upload `path` as a new base asset labelled `label` and wait until the
/// service has analysed it.
pub fn upload_model(session: &Session, path: &Path, label: &str) -> Result<JobId, WorkflowError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| WorkflowError::Input {
            path: path.to_path_buf(),
            reason: "model file has no extension".to_string(),
        })?;
    let content = fs::read(path).map_err(|source| WorkflowError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    println!("Obtaining Signed Upload URLs ...");
    let started = session
        .client
        .start_upload(&UploadStartRequest::single(&extension, label))
        .map_err(|e| {
            report_api_error(&e);
            WorkflowError::Api {
                stage: "Couldn't obtain signed upload URLs from server",
                source: e,
            }
        })?;
    let id = started.id.clone();
    let filename = upload_filename(&extension);
    let url = started
        .upload_url(&filename)
        .ok_or_else(|| WorkflowError::MissingUploadUrl(filename.clone()))?;
    tracing::info!(base_asset = %id, bytes = content.len(), "uploading model");

    println!("Uploading model file ...");
    session
        .client
        .put_upload(url, content)
        .map_err(upload_failed)?;

    println!("Inserting into base assets section ...");
    session.client.finalize_upload(&id).map_err(upload_failed)?;

    let options = session.upload_poll_options();
    if extension == "zip" {
        println!("Waiting for the server to unzip the model.");
        let handle = session.base_asset_handle(&id, StatusRule::unzip_phase());
        session
            .poller
            .poll_until_complete(&handle, &options, &mut NoProgress)
            .map_err(WorkflowError::poll("Could not get the base asset status"))?;
    }

    println!("Waiting for the server to analyse the model.");
    let rule = StatusRule::upload_analysis(session.settings.poll.upload_pending.clone());
    let handle = session.base_asset_handle(&id, rule);
    session
        .poller
        .poll_until_complete(&handle, &options, &mut NoProgress)
        .map_err(WorkflowError::poll("Could not get the base asset status"))?;

    tracing::info!(base_asset = %id, status = status::COMPLETE, "base asset ready");
    Ok(id)
}

fn upload_failed(error: crate::host::ApiError) -> WorkflowError {
    report_api_error(&error);
    WorkflowError::Api {
        stage: "Could not upload model file",
        source: error,
    }
}
