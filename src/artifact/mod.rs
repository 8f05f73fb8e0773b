//! Downloaded optimization outputs
//!
//! Output naming, hashed downloads and zip extraction.

mod download;
mod extract;

pub use download::{download_output, sha256_hex, write_output, DownloadError, HashingWriter};
pub use extract::{extract_zip, extraction_dir, ExtractError};

/// Extension used for file types that are always delivered as zip archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Extension used when an output has no matching `fileExports` entry.
pub const FALLBACK_EXTENSION: &str = "bin";

/// File extension of a delivered export. Multi-file formats come zipped.
pub fn delivered_extension(file_type: &str) -> &str {
    match file_type {
        "obj" | "gltf" => ARCHIVE_EXTENSION,
        "" => FALLBACK_EXTENSION,
        other => other,
    }
}

/// `<model>_<variant>_e<index>.<ext>`
pub fn output_file_name(model_stem: &str, variant: &str, index: usize, file_type: &str) -> String {
    format!(
        "{}_{}_e{}.{}",
        model_stem,
        variant,
        index,
        delivered_extension(file_type)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivered_extension() {
        assert_eq!(delivered_extension("glb"), "glb");
        assert_eq!(delivered_extension("usdz"), "usdz");
        assert_eq!(delivered_extension("obj"), "zip");
        assert_eq!(delivered_extension("gltf"), "zip");
        assert_eq!(delivered_extension(""), "bin");
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("chair", "web", 0, "glb"), "chair_web_e0.glb");
        assert_eq!(output_file_name("chair", "web", 2, "gltf"), "chair_web_e2.zip");
    }
}
