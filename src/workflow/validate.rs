//! `validate`: schema and content checks without touching the network.

use std::path::Path;

use super::WorkflowError;
use crate::variants::{SchemaValidator, VariantsError, VariantsFile};

/// Outcome of checking one variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantCheck {
    pub name: String,
    pub schema_valid: bool,
    /// Content rule violation, if any
    pub content_error: Option<String>,
}

impl VariantCheck {
    /// Whether `optimize` would submit this variant.
    pub fn producible(&self) -> bool {
        self.schema_valid && self.content_error.is_none()
    }
}

/// Check every variant and print the report. Fails when no variant
/// passes the schema.
pub fn run_validate(variants_file: &Path, schema_file: &Path) -> Result<Vec<VariantCheck>, WorkflowError> {
    let variants = VariantsFile::load(variants_file)?;
    let schema = SchemaValidator::load(schema_file)?;

    let mut out = std::io::stdout();
    let mut checks = Vec::with_capacity(variants.len());
    for variant in variants.iter() {
        println!("Validating configuration for variant \"{}\".", variant.name);
        let schema_valid = match variant.config() {
            Some(config) => schema.report(config, &mut out).unwrap_or(false),
            None => {
                println!("Error: variant \"{}\" has no configuration.", variant.name);
                false
            }
        };
        let content_error = variant.check_content().err().map(|e| e.to_string());
        if let Some(e) = &content_error {
            println!("Error when checking additional constraint: {e}");
        }
        checks.push(VariantCheck {
            name: variant.name.clone(),
            schema_valid,
            content_error,
        });
    }

    if checks.iter().any(|c| c.schema_valid) {
        Ok(checks)
    } else {
        println!("No valid variant configuration found.");
        Err(VariantsError::NoValidVariant.into())
    }
}
