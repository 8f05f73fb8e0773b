//! `optimize`: upload, optimize every variant, download, clean up.

use std::io::stdout;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rapid_protocol::{JobId, OptimizationResult};
use serde_json::Value;
use ulid::Ulid;

use super::{cleanup_model, report_api_error, resolve_inputs, upload_model, InputMode, ModelInput, Session, WorkflowError};
use crate::artifact::{self, download_output, extract_zip};
use crate::poll::{PollError, TerminalProgress};
use crate::summary::{FailureKind, ModelRecord, OutputRecord, RunSummary, Status, VariantRecord};
use crate::variants::{SchemaValidator, Variant, VariantsError, VariantsFile};

#[derive(Debug, Clone)]
pub struct OptimizeRequest {
    pub model: PathBuf,
    pub label: Option<String>,
    pub cleanup: bool,
    pub exit_on_error: bool,
    pub extract: bool,
}

/// Run the whole optimize command.
///
/// Fatal problems (variants, schema, upload) return an error. Per-variant
/// failures are recorded in the returned summary, which is also written
/// to the output directory.
pub fn run_optimize(session: &Session, request: &OptimizeRequest) -> Result<RunSummary, WorkflowError> {
    let run_id = Ulid::new().to_string();
    let started_at = Utc::now();
    tracing::info!(%run_id, model = %request.model.display(), "optimize run started");

    let variants = VariantsFile::load(&session.settings.variants_file)?;
    let schema = SchemaValidator::load(&session.settings.schema_file)?;

    let (mode, inputs) = resolve_inputs(&request.model)?;
    match mode {
        InputMode::Directory => println!("Running in directory mode."),
        InputMode::SingleFile => println!("Running in single-file mode."),
    }

    let mut models = Vec::with_capacity(inputs.len());
    let mut cancelled = false;

    for input in &inputs {
        if session.is_cancelled() {
            cancelled = true;
            break;
        }
        let stem = input.stem();
        let label = request.label.clone().unwrap_or_else(|| stem.clone());
        let mut record = ModelRecord::new(input.path(), label.clone());

        let base_id = match input {
            ModelInput::Existing { id, .. } => id.clone(),
            ModelInput::File(path) => {
                validate_before_upload(&variants, &schema)?;
                match upload_model(session, path, &label) {
                    Ok(id) => {
                        record.uploaded = true;
                        id
                    }
                    Err(WorkflowError::Cancelled) => {
                        cancelled = true;
                        models.push(record);
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
        };
        record.base_asset_id = Some(base_id.clone());

        for variant in variants.iter() {
            let produced = produce_variant(session, &base_id, &stem, variant, &schema, request.extract);
            let stop = produced.status == Status::Cancelled;
            record.variants.push(produced);
            if stop {
                cancelled = true;
                break;
            }
        }

        if record.uploaded && request.cleanup {
            cleanup_model(session, &mut record);
        }
        models.push(record);
        if cancelled {
            break;
        }
    }

    let mut summary = RunSummary::from_models(run_id, started_at, models, request.exit_on_error);
    if cancelled {
        summary = summary.cancelled();
    }
    let output_dir = &session.settings.output_dir;
    let path = summary
        .write_to_dir(output_dir)
        .map_err(|source| WorkflowError::Io {
            path: output_dir.clone(),
            source,
        })?;
    tracing::info!(path = %path.display(), status = ?summary.status, "run summary written");

    if request.exit_on_error && summary.variants_failed > 0 && !cancelled {
        println!("Exiting with error because of failed optimizations");
    }
    Ok(summary)
}

/// Print a schema report for every variant. At least one must pass.
fn validate_before_upload(variants: &VariantsFile, schema: &SchemaValidator) -> Result<(), WorkflowError> {
    let mut any_valid = false;
    let mut out = stdout();
    for variant in variants.iter() {
        println!("Validating configuration for variant \"{}\".", variant.name);
        let valid = match variant.config() {
            Some(config) => schema.report(config, &mut out).unwrap_or(false),
            None => {
                println!("Error: variant \"{}\" has no configuration.", variant.name);
                false
            }
        };
        any_valid |= valid;
    }
    if any_valid {
        Ok(())
    } else {
        println!("No valid variant configuration found. Terminating.");
        Err(VariantsError::NoValidVariant.into())
    }
}

/// Submit, poll and download one variant. Never fails the run by itself.
pub fn produce_variant(
    session: &Session,
    base_id: &JobId,
    model_stem: &str,
    variant: &Variant,
    schema: &SchemaValidator,
    extract: bool,
) -> VariantRecord {
    println!("Producing asset variant \"{}\".", variant.name);

    if !variant.is_schema_valid(schema) {
        return VariantRecord::skipped(&variant.name, "configuration does not match the workflow schema");
    }
    if let Err(e) = variant.check_content() {
        println!("Error when checking additional constraint: {e}");
        return VariantRecord::skipped(&variant.name, e.to_string());
    }

    println!("Optimizing ...");
    let rapid_model_id = match session.client.submit_optimization(base_id, &variant.definition) {
        Ok(response) => response.id,
        Err(e) => {
            report_api_error(&e);
            println!("Could not create optimized variant \"{}\".", variant.name);
            return VariantRecord::failed(&variant.name, FailureKind::Submission, e.to_string());
        }
    };
    tracing::info!(variant = %variant.name, rapid_model = %rapid_model_id, "optimization queued");

    let mut progress = TerminalProgress::stdout();
    let payload = match session.wait_for_optimization(&rapid_model_id, &mut progress) {
        Ok(payload) => payload,
        Err(e) => {
            progress.abandon();
            println!("Optimization of variant \"{}\" failed: {e}", variant.name);
            let kind = match e {
                PollError::Cancelled => FailureKind::Cancelled,
                PollError::DeadlineExceeded { .. } => FailureKind::Timeout,
                PollError::Communication(_) | PollError::UnexpectedStatus(_) => FailureKind::Polling,
            };
            return VariantRecord::failed(&variant.name, kind, e.to_string())
                .with_rapid_model_id(rapid_model_id);
        }
    };

    let mut record = match download_results(session, &payload, model_stem, variant, extract) {
        Ok((outputs, download_errors)) => {
            let mut record = VariantRecord::new(&variant.name, Status::Success);
            record.outputs = outputs;
            record.download_errors = download_errors;
            record
        }
        Err(e) => VariantRecord::failed(&variant.name, FailureKind::Result, e),
    };
    record.rapid_model_id = Some(rapid_model_id);
    record
}

/// Download every entry of `downloads.all`, pairing entry `i` with
/// `fileExports[i]`. Failed downloads are reported and skipped.
pub fn download_results(
    session: &Session,
    payload: &Value,
    model_stem: &str,
    variant: &Variant,
    extract: bool,
) -> Result<(Vec<OutputRecord>, Vec<String>), String> {
    let result = OptimizationResult::from_data(payload)
        .map_err(|e| format!("optimization result has no downloads: {e}"))?;
    let exports = variant.file_exports();
    let output_dir = &session.settings.output_dir;

    let mut outputs = Vec::new();
    let mut errors = Vec::new();
    for (index, (key, url)) in result.downloads.all.iter().enumerate() {
        let Some(url) = url.as_str() else {
            tracing::warn!(%key, "download entry without URL");
            continue;
        };
        let file_type = exports.get(index).copied().unwrap_or("");
        let target = output_dir.join(artifact::output_file_name(model_stem, &variant.name, index, file_type));

        match download_output(&session.client, url, &target) {
            Ok(mut output) => {
                if extract {
                    output.extracted_to = extract_output(&target);
                }
                outputs.push(output);
            }
            Err(e) => {
                println!("Error: {e}");
                errors.push(e.to_string());
            }
        }
    }
    Ok((outputs, errors))
}

fn extract_output(path: &Path) -> Option<PathBuf> {
    let is_zip = path
        .extension()
        .is_some_and(|e| e == artifact::ARCHIVE_EXTENSION);
    if !is_zip {
        return None;
    }
    match extract_zip(path) {
        Ok((dir, entries)) => {
            println!("Extracted {entries} file(s) to \"{}\".", dir.display());
            Some(dir)
        }
        Err(e) => {
            println!("Error: {e}");
            None
        }
    }
}
