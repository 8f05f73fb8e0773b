use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::ZipArchive;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to extract {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },
}

/// Sibling directory named after the archive stem: `out/a_b_e1.zip` → `out/a_b_e1`.
pub fn extraction_dir(archive: &Path) -> PathBuf {
    archive.with_extension("")
}

/// Unpack `archive` next to itself. Returns the directory and the number
/// of entries extracted.
pub fn extract_zip(archive: &Path) -> Result<(PathBuf, usize), ExtractError> {
    let file = File::open(archive).map_err(|source| ExtractError::Io {
        path: archive.to_path_buf(),
        source,
    })?;
    let zip_error = |source| ExtractError::Zip {
        path: archive.to_path_buf(),
        source,
    };
    let mut zip = ZipArchive::new(file).map_err(zip_error)?;

    let dest = extraction_dir(archive);
    fs::create_dir_all(&dest).map_err(|source| ExtractError::Io {
        path: dest.clone(),
        source,
    })?;
    // entries with absolute or `..` paths are rejected by `extract`
    zip.extract(&dest).map_err(zip_error)?;
    tracing::debug!(archive = %archive.display(), entries = zip.len(), "archive extracted");

    Ok((dest, zip.len()))
}
