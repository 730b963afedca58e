//! Append-only audit log of attempted mutations.
//!
//! # Format
//! One JSON object per line (`ChangeRecord`), appended in call order and
//! never rewritten. Rotation and retention belong to whatever ships the file.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::model::{Mutation, ReconciliationOutcome};

/// One audit entry, written at the end of every `apply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub mutation: Mutation,
    pub outcome: ReconciliationOutcome,
}

impl ChangeRecord {
    pub fn new(mutation: Mutation, outcome: ReconciliationOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            mutation,
            outcome,
        }
    }
}

#[derive(Debug, Error)]
pub enum ChangeLogError {
    #[error("change log I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("change record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable destination for change records.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, record: &ChangeRecord) -> Result<(), ChangeLogError>;

    /// Up to `limit` records, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<ChangeRecord>, ChangeLogError>;
}

/// JSON-lines change log on the local filesystem.
#[derive(Debug)]
pub struct JsonlChangeLog {
    path: PathBuf,
    append_lock: Mutex<()>,
}

impl JsonlChangeLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            append_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> ChangeLogError {
        ChangeLogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl AuditSink for JsonlChangeLog {
    async fn append(&self, record: &ChangeRecord) -> Result<(), ChangeLogError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.append_lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.sync_data().await.map_err(|e| self.io_error(e))?;

        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChangeRecord>, ChangeLogError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        Ok(content
            .lines()
            .rev()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<ChangeRecord>(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable change record");
                    None
                }
            })
            .take(limit)
            .collect())
    }
}
