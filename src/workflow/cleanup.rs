//! Remote cleanup after an optimize run.
//!
//! Deletes the uploaded base asset and every rapid model produced from it.
//! Failures are reported and recorded, never fatal.

use super::{report_api_error, Session};
use crate::host::ApiError;
use crate::summary::ModelRecord;

pub fn cleanup_model(session: &Session, record: &mut ModelRecord) {
    let Some(base_id) = record.base_asset_id.clone() else {
        return;
    };
    println!(
        "Cleaning up: deleting uploaded base asset and optimized results. \
         If you want to skip this step, run again with option --no-cleanup."
    );

    println!("Deleting base asset from cloud storage ...");
    let outcome = session.client.delete_base_asset(&base_id);
    report(outcome, "Could not delete base asset from cloud storage.", &mut record.cleanup_errors);

    let rapid_ids: Vec<_> = record.rapid_model_ids().into_iter().cloned().collect();
    for id in rapid_ids {
        println!("Deleting optimized model from cloud storage ...");
        let outcome = session.client.delete_rapid_model(&id);
        report(outcome, "Could not delete optimized model from cloud storage.", &mut record.cleanup_errors);
    }
}

fn report(outcome: Result<(), ApiError>, failure: &str, errors: &mut Vec<String>) {
    match outcome {
        Ok(()) => println!("Success."),
        Err(e) => {
            if matches!(e, ApiError::Server { .. } | ApiError::Transport(_)) {
                report_api_error(&e);
            }
            println!("{failure}");
            tracing::warn!(error = %e, "cleanup request failed");
            errors.push(e.to_string());
        }
    }
}
