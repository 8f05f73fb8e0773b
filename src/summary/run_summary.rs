//! Run summary (run_summary.json)
//!
//! Written to the output directory after `optimize`, whether the run
//! succeeded, failed or was cancelled.

use chrono::{DateTime, Utc};
use rapid_protocol::JobId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::failure::{ExitCode, ExitCodeAggregator, FailureKind, Status};

/// Schema version for run_summary.json
pub const RUN_SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for run_summary.json
pub const RUN_SUMMARY_SCHEMA_ID: &str = "rapidcompact/run_summary@1";

/// File name inside the output directory
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

/// A file written by the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub path: PathBuf,
    pub bytes: u64,
    /// Lowercase hex SHA-256 of the file contents
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_to: Option<PathBuf>,
}

/// Outcome of one variant of one model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rapid_model_id: Option<JobId>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub outputs: Vec<OutputRecord>,
    /// Download failures; reported but not counted as a failed variant
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub download_errors: Vec<String>,
}

impl VariantRecord {
    pub fn new(name: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.into(),
            rapid_model_id: None,
            status,
            failure_kind: None,
            error: None,
            outputs: Vec::new(),
            download_errors: Vec::new(),
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut record = Self::new(name, Status::Skipped);
        record.error = Some(reason.into());
        record
    }

    pub fn failed(name: impl Into<String>, kind: FailureKind, error: impl Into<String>) -> Self {
        let status = if kind == FailureKind::Cancelled {
            Status::Cancelled
        } else {
            Status::Failed
        };
        let mut record = Self::new(name, status);
        record.failure_kind = Some(kind);
        record.error = Some(error.into());
        record
    }

    pub fn with_rapid_model_id(mut self, id: JobId) -> Self {
        self.rapid_model_id = Some(id);
        self
    }
}

/// Everything done for one input model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub input: PathBuf,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_asset_id: Option<JobId>,
    /// False when an existing base asset was reused via `<id>.id`
    pub uploaded: bool,
    pub variants: Vec<VariantRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cleanup_errors: Vec<String>,
}

impl ModelRecord {
    pub fn new(input: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            label: label.into(),
            base_asset_id: None,
            uploaded: false,
            variants: Vec::new(),
            cleanup_errors: Vec::new(),
        }
    }

    /// Rapid model ids of every variant that was created remotely
    pub fn rapid_model_ids(&self) -> Vec<&JobId> {
        self.variants
            .iter()
            .filter_map(|v| v.rapid_model_id.as_ref())
            .collect()
    }
}

/// Run summary (run_summary.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub schema_version: u32,
    pub schema_id: String,
    /// ULID
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: Status,
    pub exit_code: i32,
    pub variants_succeeded: usize,
    pub variants_failed: usize,
    pub variants_skipped: usize,
    pub models: Vec<ModelRecord>,
    pub human_summary: String,
}

impl RunSummary {
    /// Aggregate model records into a summary
    pub fn from_models(
        run_id: String,
        started_at: DateTime<Utc>,
        models: Vec<ModelRecord>,
        exit_on_error: bool,
    ) -> Self {
        let mut aggregator = ExitCodeAggregator::new();
        let mut variants_succeeded = 0;
        let mut variants_skipped = 0;

        for variant in models.iter().flat_map(|m| m.variants.iter()) {
            aggregator.add(variant.status);
            match variant.status {
                Status::Success => variants_succeeded += 1,
                Status::Skipped => variants_skipped += 1,
                Status::Failed | Status::Cancelled => {}
            }
        }

        let status = aggregator.status();
        let variants_failed = aggregator.failed_count();
        let human_summary = Self::generate_human_summary(
            status,
            models.len(),
            variants_succeeded,
            variants_failed,
            variants_skipped,
        );

        Self {
            schema_version: RUN_SUMMARY_SCHEMA_VERSION,
            schema_id: RUN_SUMMARY_SCHEMA_ID.to_string(),
            run_id,
            started_at,
            finished_at: Utc::now(),
            status,
            exit_code: aggregator.exit_code(exit_on_error).as_i32(),
            variants_succeeded,
            variants_failed,
            variants_skipped,
            models,
            human_summary,
        }
    }

    /// Mark the run as interrupted regardless of variant outcomes
    pub fn cancelled(mut self) -> Self {
        self.status = Status::Cancelled;
        self.exit_code = ExitCode::Cancelled.as_i32();
        self.human_summary = format!("Run cancelled after {} variant(s) succeeded", self.variants_succeeded);
        self
    }

    /// One line per failed variant: `<label> / <variant>: <reason>`.
    pub fn failure_lines(&self) -> Vec<String> {
        self.models
            .iter()
            .flat_map(|m| {
                m.variants.iter().filter_map(move |v| {
                    v.failure_kind
                        .map(|kind| format!("{} / {}: {}", m.label, v.name, kind.description()))
                })
            })
            .collect()
    }

    fn generate_human_summary(
        status: Status,
        model_count: usize,
        succeeded: usize,
        failed: usize,
        skipped: usize,
    ) -> String {
        match status {
            Status::Success => format!(
                "Run succeeded: {} variant(s) produced for {} model(s), {} skipped",
                succeeded, model_count, skipped
            ),
            Status::Failed => format!(
                "Run finished with failures: {} succeeded, {} failed, {} skipped",
                succeeded, failed, skipped
            ),
            Status::Cancelled => format!("Run cancelled after {} variant(s) succeeded", succeeded),
            Status::Skipped => "No variant was produced".to_string(),
        }
    }

    pub fn exit_code_enum(&self) -> Option<ExitCode> {
        ExitCode::from_i32(self.exit_code)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write `run_summary.json` into `dir`, returning the path written
    pub fn write_to_dir(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(RUN_SUMMARY_FILE);
        self.write_to_file(&path)?;
        Ok(path)
    }

    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }

    pub fn from_file(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))
    }
}
