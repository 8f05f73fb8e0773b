use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::host::{ApiClient, ApiError};
use crate::summary::OutputRecord;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to download {url}: {source}")]
    Api {
        url: String,
        #[source]
        source: ApiError,
    },
}

/// Writer adapter that hashes and counts everything passing through.
pub struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha256,
    bytes: u64,
}

impl<W: Write> HashingWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            bytes: 0,
        }
    }

    /// Returns the inner writer, the hex digest and the byte count.
    pub fn finish(self) -> (W, String, u64) {
        (self.inner, hex::encode(self.hasher.finalize()), self.bytes)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn partial_path(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> DownloadError + '_ {
    move |source| DownloadError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Stream `url` to `target`.
///
/// The body lands in `<target>.part` first and is renamed once complete, so
/// an interrupted download never leaves a truncated output behind.
pub fn download_output(client: &ApiClient, url: &str, target: &Path) -> Result<OutputRecord, DownloadError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let partial = partial_path(target);
    let file = File::create(&partial).map_err(io_error(&partial))?;
    let mut writer = HashingWriter::new(BufWriter::new(file));

    let streamed = client
        .download_to(url, &mut writer)
        .map_err(|source| DownloadError::Api {
            url: url.to_string(),
            source,
        })
        .and_then(|_| writer.flush().map_err(io_error(&partial)));
    if let Err(e) = streamed {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }

    let (_, sha256, bytes) = writer.finish();
    fs::rename(&partial, target).map_err(io_error(target))?;
    tracing::info!(path = %target.display(), bytes, "output downloaded");

    Ok(OutputRecord {
        path: target.to_path_buf(),
        bytes,
        sha256,
        extracted_to: None,
    })
}

/// Write an in-memory output (such as a preset package) and record it.
pub fn write_output(target: &Path, content: &[u8]) -> Result<OutputRecord, DownloadError> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    fs::write(target, content).map_err(io_error(target))?;
    Ok(OutputRecord {
        path: target.to_path_buf(),
        bytes: content.len() as u64,
        sha256: sha256_hex(content),
        extracted_to: None,
    })
}
