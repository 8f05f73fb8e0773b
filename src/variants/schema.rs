//! JSON Schema validation of variant configurations.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use jsonschema::Validator;
use serde_json::Value;

const REPORT_RULE: &str =
    "********************************************************************************";

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema couldn't be read from file \"{path}\": {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("schema file \"{path}\" is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("schema file \"{path}\" is not a usable JSON Schema: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// Compiled workflow schema.
pub struct SchemaValidator {
    validator: Validator,
    path: PathBuf,
}

impl std::fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaValidator").field("path", &self.path).finish()
    }
}

impl SchemaValidator {
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let schema: Value = serde_json::from_str(&content).map_err(|source| SchemaError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_value(&schema, path)
    }

    pub fn from_value(schema: &Value, path: &Path) -> Result<Self, SchemaError> {
        let validator = jsonschema::validator_for(schema).map_err(|e| SchemaError::Invalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self {
            validator,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_valid(&self, config: &Value) -> bool {
        self.validator.is_valid(config)
    }

    /// Every violation as `<instance path>: <message>`.
    pub fn errors(&self, config: &Value) -> Vec<String> {
        self.validator
            .iter_errors(config)
            .map(|e| {
                let location = e.instance_path.to_string();
                if location.is_empty() {
                    e.to_string()
                } else {
                    format!("{location}: {e}")
                }
            })
            .collect()
    }

    /// Validate and print a human-readable report. Returns whether the
    /// configuration passed.
    pub fn report<W: Write + ?Sized>(&self, config: &Value, out: &mut W) -> std::io::Result<bool> {
        let errors = self.errors(config);
        if errors.is_empty() {
            writeln!(out, "Variant configuration passed validation.")?;
            return Ok(true);
        }
        writeln!(
            out,
            "Error: Variant configuration is not valid - see JSON validation report on how to fix this:"
        )?;
        writeln!(out, "{REPORT_RULE}")?;
        for error in &errors {
            writeln!(out, "{error}")?;
        }
        writeln!(out, "{REPORT_RULE}")?;
        Ok(false)
    }
}
