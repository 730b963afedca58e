//! Self-deleting scratch files.

use std::io;
use std::path::{Path, PathBuf};

use crate::store::unique_file_name;

/// A uniquely named file that is removed when the guard is dropped.
#[derive(Debug)]
pub struct DisposableFile {
    path: PathBuf,
}

impl DisposableFile {
    /// Write `content` to a fresh file in `dir`.
    ///
    /// The guard exists before the first byte is written, so a failed write
    /// still cleans up whatever was created.
    pub async fn create(dir: &Path, prefix: &str, content: &str) -> io::Result<Self> {
        let file = Self {
            path: dir.join(unique_file_name(prefix, "cfg")),
        };
        tokio::fs::write(&file.path, content).await?;
        Ok(file)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DisposableFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove disposable file"
            ),
        }
    }
}
