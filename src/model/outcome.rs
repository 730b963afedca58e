//! Result of applying a mutation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which path produced the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathUsed {
    Runtime,
    FilePatch,
    None,
}

impl PathUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathUsed::Runtime => "runtime",
            PathUsed::FilePatch => "file_patch",
            PathUsed::None => "none",
        }
    }
}

impl fmt::Display for PathUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single result returned to callers of `apply`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    pub success: bool,
    pub path_used: PathUsed,
    pub diagnostics: String,
    pub timestamp: DateTime<Utc>,
}

impl ReconciliationOutcome {
    pub fn succeeded(path_used: PathUsed, diagnostics: impl Into<String>) -> Self {
        Self {
            success: true,
            path_used,
            diagnostics: diagnostics.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn failed(path_used: PathUsed, diagnostics: impl Into<String>) -> Self {
        Self {
            success: false,
            path_used,
            diagnostics: diagnostics.into(),
            timestamp: Utc::now(),
        }
    }
}
