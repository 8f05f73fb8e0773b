//! Model inputs
//!
//! `<model>` may be a directory (every regular file directly inside it,
//! sorted by name), a single model file, or `<id>.id` naming an existing
//! base asset.

use std::path::{Path, PathBuf};

use rapid_protocol::JobId;
use walkdir::WalkDir;

use super::WorkflowError;

const EXISTING_ASSET_EXTENSION: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Directory,
    SingleFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelInput {
    /// A model file to upload
    File(PathBuf),
    /// An already uploaded base asset; no upload and no cleanup
    Existing { path: PathBuf, id: JobId },
}

impl ModelInput {
    pub fn classify(path: &Path) -> Result<Self, WorkflowError> {
        let is_id = path
            .extension()
            .is_some_and(|ext| ext == EXISTING_ASSET_EXTENSION);
        if !is_id {
            return Ok(ModelInput::File(path.to_path_buf()));
        }

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let id = stem.parse::<JobId>().map_err(|_| WorkflowError::Input {
            path: path.to_path_buf(),
            reason: "expected <base asset id>.id".to_string(),
        })?;
        Ok(ModelInput::Existing {
            path: path.to_path_buf(),
            id,
        })
    }

    pub fn path(&self) -> &Path {
        match self {
            ModelInput::File(path) | ModelInput::Existing { path, .. } => path,
        }
    }

    /// File name without directory and extension; prefixes every output.
    pub fn stem(&self) -> String {
        self.path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Lowercased extension of a model file.
    pub fn extension(&self) -> Option<String> {
        match self {
            ModelInput::File(path) => path
                .extension()
                .map(|e| e.to_string_lossy().to_ascii_lowercase()),
            ModelInput::Existing { .. } => None,
        }
    }

    pub fn is_upload(&self) -> bool {
        matches!(self, ModelInput::File(_))
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Expand `<model>` into the list of inputs to process.
pub fn resolve_inputs(model: &Path) -> Result<(InputMode, Vec<ModelInput>), WorkflowError> {
    if model.is_dir() {
        let mut inputs = Vec::new();
        for entry in WalkDir::new(model)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| WorkflowError::Io {
                path: model.to_path_buf(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() || is_hidden(entry.path()) {
                continue;
            }
            inputs.push(ModelInput::classify(entry.path())?);
        }
        return Ok((InputMode::Directory, inputs));
    }

    let input = ModelInput::classify(model)?;
    if input.is_upload() && !model.is_file() {
        return Err(WorkflowError::Input {
            path: model.to_path_buf(),
            reason: "no such file or directory".to_string(),
        });
    }
    Ok((InputMode::SingleFile, vec![input]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_classify_existing_asset() {
        let input = ModelInput::classify(Path::new("models/1234.id")).unwrap();
        assert_eq!(
            input,
            ModelInput::Existing {
                path: PathBuf::from("models/1234.id"),
                id: JobId::Number(1234)
            }
        );
        assert_eq!(input.stem(), "1234");
        assert!(!input.is_upload());
        assert_eq!(input.extension(), None);
    }

    #[test]
    fn test_classify_model_file() {
        let input = ModelInput::classify(Path::new("models/Chair.GLB")).unwrap();
        assert!(input.is_upload());
        assert_eq!(input.stem(), "Chair");
        assert_eq!(input.extension().as_deref(), Some("glb"));
    }

    #[test]
    fn test_directory_mode_sorted_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.glb"), b"b").unwrap();
        fs::write(dir.path().join("a.zip"), b"a").unwrap();
        fs::write(dir.path().join("7.id"), b"").unwrap();
        fs::write(dir.path().join(".DS_Store"), b"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/c.glb"), b"c").unwrap();

        let (mode, inputs) = resolve_inputs(dir.path()).unwrap();
        assert_eq!(mode, InputMode::Directory);
        let stems: Vec<_> = inputs.iter().map(ModelInput::stem).collect();
        assert_eq!(stems, ["7", "a", "b"]);
        assert!(!inputs[0].is_upload());
    }

    #[test]
    fn test_single_file_mode() {
        let dir = TempDir::new().unwrap();
        let model = dir.path().join("chair.glb");
        fs::write(&model, b"glTF").unwrap();

        let (mode, inputs) = resolve_inputs(&model).unwrap();
        assert_eq!(mode, InputMode::SingleFile);
        assert_eq!(inputs, vec![ModelInput::File(model)]);
    }

    #[test]
    fn test_id_input_need_not_exist() {
        let (mode, inputs) = resolve_inputs(Path::new("99.id")).unwrap();
        assert_eq!(mode, InputMode::SingleFile);
        assert!(!inputs[0].is_upload());
    }

    #[test]
    fn test_missing_model_file() {
        let err = resolve_inputs(Path::new("/nonexistent/chair.glb")).unwrap_err();
        assert!(matches!(err, WorkflowError::Input { .. }));
    }
}
