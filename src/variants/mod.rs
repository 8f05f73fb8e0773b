//! Variant definitions
//!
//! `variants.json` maps variant names to optimization requests:
//!
//! ```json
//! {"variants": {"web": {"config": {"compressionAndExport": {"fileExports": [...]}}}}}
//! ```
//!
//! Variant order is file order. The whole variant object is what gets
//! posted to the optimize endpoint; only `config` is schema-checked.

pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

pub use schema::{SchemaError, SchemaValidator};

/// The only file type accepted as the first export.
pub const PRIMARY_EXPORT_TYPE: &str = "glb";

#[derive(Debug, thiserror::Error)]
pub enum VariantsError {
    #[error("Unable to load variant definitions file \"{path}\": {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse variant definitions file \"{path}\": {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No valid variant configuration found")]
    NoValidVariant,
}

/// Why a variant cannot be produced even though its config may be valid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("variant has no `config` object")]
    MissingConfig,

    #[error("`config.compressionAndExport.fileExports` is missing or empty")]
    NoExports,

    #[error("first export must be \"glb\" (given: \"{0}\")")]
    FirstExportNotGlb(String),
}

#[derive(Debug, Deserialize)]
struct RawVariantsFile {
    variants: Map<String, Value>,
}

/// One named variant.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub name: String,
    pub definition: Value,
}

impl Variant {
    pub fn new(name: impl Into<String>, definition: Value) -> Self {
        Self {
            name: name.into(),
            definition,
        }
    }

    pub fn config(&self) -> Option<&Value> {
        self.definition.get("config").filter(|c| c.is_object())
    }

    /// `fileType` of every export, in order. Entries without one yield "".
    pub fn file_exports(&self) -> Vec<&str> {
        self.config()
            .and_then(|c| c.pointer("/compressionAndExport/fileExports"))
            .and_then(Value::as_array)
            .map(|exports| {
                exports
                    .iter()
                    .map(|e| e.get("fileType").and_then(Value::as_str).unwrap_or(""))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn check_content(&self) -> Result<(), ContentError> {
        if self.config().is_none() {
            return Err(ContentError::MissingConfig);
        }
        match self.file_exports().first() {
            None => Err(ContentError::NoExports),
            Some(first) if *first == PRIMARY_EXPORT_TYPE => Ok(()),
            Some(other) => Err(ContentError::FirstExportNotGlb(other.to_string())),
        }
    }

    /// Schema check of `config`; a missing config never passes.
    pub fn is_schema_valid(&self, schema: &SchemaValidator) -> bool {
        self.config().is_some_and(|c| schema.is_valid(c))
    }
}

/// Parsed variants file, in file order.
#[derive(Debug, Clone, Default)]
pub struct VariantsFile {
    pub variants: Vec<Variant>,
}

impl VariantsFile {
    pub fn load(path: &Path) -> Result<Self, VariantsError> {
        let content = fs::read_to_string(path).map_err(|source| VariantsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| VariantsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        let raw: RawVariantsFile = serde_json::from_str(content)?;
        Ok(Self {
            variants: raw
                .variants
                .into_iter()
                .map(|(name, definition)| Variant::new(name, definition))
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn variant(exports: Value) -> Variant {
        Variant::new(
            "v",
            json!({"config": {"compressionAndExport": {"fileExports": exports}}}),
        )
    }

    #[test]
    fn test_parse_keeps_file_order() {
        let file = VariantsFile::parse(
            r#"{"variants": {"zeta": {"config": {}}, "alpha": {"config": {}}, "mid": {"config": {}}}}"#,
        )
        .unwrap();
        let names: Vec<_> = file.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        assert!(file.get("alpha").is_some());
    }

    #[test]
    fn test_parse_requires_variants_object() {
        assert!(VariantsFile::parse(r#"{"other": {}}"#).is_err());
        assert!(VariantsFile::parse(r#"{"variants": []}"#).is_err());
    }

    #[test]
    fn test_file_exports() {
        let v = variant(json!([{"fileType": "glb"}, {"fileType": "usdz"}, {}]));
        assert_eq!(v.file_exports(), ["glb", "usdz", ""]);
    }

    #[test]
    fn test_content_rule() {
        assert_eq!(variant(json!([{"fileType": "glb"}, {"fileType": "obj"}])).check_content(), Ok(()));
        assert_eq!(
            variant(json!([{"fileType": "obj"}])).check_content(),
            Err(ContentError::FirstExportNotGlb("obj".to_string()))
        );
        assert_eq!(variant(json!([])).check_content(), Err(ContentError::NoExports));
        assert_eq!(
            Variant::new("bare", json!({})).check_content(),
            Err(ContentError::MissingConfig)
        );
    }

    #[test]
    fn test_load_missing_file() {
        let err = VariantsFile::load(Path::new("/nonexistent/variants.json")).unwrap_err();
        assert!(matches!(err, VariantsError::Io { .. }));
    }
}
