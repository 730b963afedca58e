//! Errors raised on the file-patch path.

use thiserror::Error;

use crate::store::{PatchError, StoreError};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("validation failed: {diagnostics}")]
    ValidationFailed { diagnostics: String },

    #[error("reload failed: {diagnostics}")]
    ReloadFailed { diagnostics: String },
}

impl ReconcileError {
    /// The request itself is malformed (unknown backend or server); no
    /// other path could succeed either.
    pub fn is_request_error(&self) -> bool {
        matches!(self, ReconcileError::Patch(_))
    }
}
