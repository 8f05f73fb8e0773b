//! Shared fixtures for integration tests
//!
//! - Status bodies as returned by `rawmodel/{id}` and `rapidmodel/{id}`
//! - Variant, schema and credentials files in a temp directory
//! - Settings and sessions pointed at a mock server

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rapidcompact_cli::poll::ManualClock;
use rapidcompact_cli::{CancelToken, Session, Settings};
use serde_json::{json, Value};

pub const TOKEN: &str = "test-token";

/// Path to the schema shipped with the crate
pub fn bundled_schema_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("schema/workflow_schema_v2_5.schema.json")
}

pub fn optimization_status(status: &str, progress: Option<u8>, step: Option<&str>) -> Value {
    let mut data = json!({ "optimization_status": status });
    if let Some(p) = progress {
        data["progress"] = json!(p);
    }
    if let Some(s) = step {
        data["processing_step"] = json!(s);
    }
    json!({ "data": data })
}

pub fn optimization_done(downloads: Value) -> Value {
    json!({
        "data": {
            "optimization_status": "done",
            "progress": 100,
            "downloads": { "all": downloads }
        }
    })
}

pub fn upload_status(status: &str) -> Value {
    json!({ "data": { "upload_status": status } })
}

/// Two variants: `web` (glb + gltf) and `ar` (usdz first, skipped at
/// production time by the glb-first rule).
pub fn sample_variants() -> Value {
    json!({
        "variants": {
            "web": {
                "config": {
                    "compressionAndExport": {
                        "fileExports": [{ "fileType": "glb" }, { "fileType": "gltf" }]
                    }
                }
            },
            "ar": {
                "config": {
                    "compressionAndExport": {
                        "fileExports": [{ "fileType": "usdz" }]
                    }
                }
            }
        }
    })
}

pub fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}

/// Settings with every file inside `dir` and the given base URL.
pub fn settings(base_url: &str, dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.base_url = format!("{}/", base_url.trim_end_matches('/'));
    settings.credentials_file = write_json(dir, "credentials.json", &json!({ "token": TOKEN }));
    settings.variants_file = write_json(dir, "variants.json", &sample_variants());
    settings.schema_file = bundled_schema_path();
    settings.output_dir = dir.join("output");
    settings
}

/// Session on a virtual clock, so pending statuses do not sleep.
pub fn session(settings: Settings) -> (Session, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let session = Session::new(settings, TOKEN, CancelToken::new())
        .unwrap()
        .with_clock(clock.clone());
    (session, clock)
}
