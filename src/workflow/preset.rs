//! `preset`: convert variants into CLI preset packages.

use super::{report_api_error, Session, WorkflowError};
use crate::artifact::{extract_zip, write_output};
use crate::summary::OutputRecord;
use crate::variants::{SchemaValidator, VariantsFile};

#[derive(Debug, Clone, Copy, Default)]
pub struct PresetRequest {
    pub exit_on_error: bool,
    pub extract: bool,
}

/// Convert every schema-valid variant to `<output>/<variant>.zip`.
///
/// Returns the written outputs. With `exit_on_error`, the first failed
/// conversion aborts the command.
pub fn run_preset(session: &Session, request: &PresetRequest) -> Result<Vec<OutputRecord>, WorkflowError> {
    let variants = VariantsFile::load(&session.settings.variants_file)?;
    let schema = SchemaValidator::load(&session.settings.schema_file)?;
    let output_dir = &session.settings.output_dir;

    let mut outputs = Vec::new();
    let mut out = std::io::stdout();
    for variant in variants.iter() {
        if session.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }
        println!("Validating configuration for variant \"{}\".", variant.name);
        let Some(config) = variant.config() else {
            println!("Error: variant \"{}\" has no configuration.", variant.name);
            continue;
        };
        if !schema.report(config, &mut out).unwrap_or(false) {
            continue;
        }

        let target = output_dir.join(format!("{}.zip", variant.name));
        let converted = session
            .client
            .convert_preset(&variant.definition)
            .map_err(|e| {
                report_api_error(&e);
                e.to_string()
            })
            .and_then(|bytes| write_output(&target, &bytes).map_err(|e| e.to_string()));

        match converted {
            Ok(mut output) => {
                println!("Success: CLI Preset written to \"{}\"", target.display());
                if request.extract {
                    match extract_zip(&target) {
                        Ok((dir, _)) => output.extracted_to = Some(dir),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                outputs.push(output);
            }
            Err(e) => {
                println!("Could not convert to CLI preset.");
                tracing::warn!(variant = %variant.name, error = %e, "preset conversion failed");
                if request.exit_on_error {
                    return Err(WorkflowError::PresetFailed);
                }
            }
        }
    }
    Ok(outputs)
}
