//! Proxy configuration storage.
//!
//! # Data Flow
//! ```text
//! ConfigStore::read()  → ConfigSnapshot {content, hash}
//!     → patch.rs (pure text edits on a backend block)
//!     → validator (checks a disposable copy)
//!     → ConfigStore::write(base snapshot, new text)
//!         → hash check against disk (external edit → Conflict)
//!         → scratch file next to the live file
//!         → rename over the live file (promote)
//! ```
//!
//! # Design Decisions
//! - Single writer: callers hold `lock()` across read, patch, validate and write
//! - Read failures surface as errors; no placeholder configuration is ever
//!   substituted for a file that cannot be read
//! - The scratch file never outlives a failed write

pub mod patch;
pub mod snapshot;

pub use patch::{PatchError, ServerEntry};
pub use snapshot::ConfigSnapshot;

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

/// Errors reading or writing the live configuration.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("configuration file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("permission denied on configuration file {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration {} changed on disk since it was read (expected {expected}, found {found})", .path.display())]
    Conflict {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

impl StoreError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => StoreError::PermissionDenied(path.to_path_buf()),
            _ => StoreError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}

/// A collision-free file name: `<prefix>_<unix-nanos>_<random>.<extension>`.
pub fn unique_file_name(prefix: &str, extension: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{}_{}_{:08x}.{}", prefix, nanos, fastrand::u32(..), extension)
}

/// Owner of the live configuration file.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the live file currently exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Acquire the single-writer guard.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    pub async fn read(&self) -> Result<ConfigSnapshot, StoreError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| StoreError::from_io(&self.path, e))?;
        Ok(ConfigSnapshot::new(content))
    }

    /// Replace the live file with `content` if it still matches `base`.
    pub async fn write(
        &self,
        base: &ConfigSnapshot,
        content: &str,
    ) -> Result<ConfigSnapshot, StoreError> {
        let current = self.read().await?;
        if !base.matches(&current.content) {
            return Err(StoreError::Conflict {
                path: self.path.clone(),
                expected: base.hash.clone(),
                found: current.hash,
            });
        }

        let scratch = self.scratch_path();
        tokio::fs::write(&scratch, content)
            .await
            .map_err(|e| StoreError::from_io(&scratch, e))?;

        if let Ok(meta) = tokio::fs::metadata(&self.path).await {
            if let Err(e) = tokio::fs::set_permissions(&scratch, meta.permissions()).await {
                tracing::warn!(
                    path = %scratch.display(),
                    error = %e,
                    "Could not copy permissions onto new configuration"
                );
            }
        }

        if let Err(e) = tokio::fs::rename(&scratch, &self.path).await {
            let _ = tokio::fs::remove_file(&scratch).await;
            // Bind-mounted files cannot be renamed over; write in place instead.
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Atomic promote failed, writing configuration in place"
            );
            tokio::fs::write(&self.path, content)
                .await
                .map_err(|e| StoreError::from_io(&self.path, e))?;
        }

        tracing::info!(
            path = %self.path.display(),
            bytes = content.len(),
            "Configuration written"
        );
        Ok(ConfigSnapshot::new(content.to_string()))
    }

    fn scratch_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "config".to_string());
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        dir.join(format!(".{}", unique_file_name(&stem, "tmp")))
    }
}
