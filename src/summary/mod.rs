//! Run outcome reporting
//!
//! Exit codes and the run_summary.json artifact.

mod failure;
mod run_summary;

pub use failure::{ExitCode, ExitCodeAggregator, FailureKind, Status};
pub use run_summary::{
    ModelRecord, OutputRecord, RunSummary, VariantRecord, RUN_SUMMARY_FILE, RUN_SUMMARY_SCHEMA_ID,
    RUN_SUMMARY_SCHEMA_VERSION,
};
