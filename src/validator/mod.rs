//! Configuration validation subsystem.
//!
//! # Data Flow
//! ```text
//! candidate config text
//!     → disposable.rs (uniquely named file, removed on drop)
//!     → check.rs (`haproxy -c -f <file>`, bounded timeout)
//!     → ValidationResult {valid, output, errors}
//! ```
//!
//! # Design Decisions
//! - The live configuration is never handed to the checker
//! - Disposable files are named `<prefix>_<nanos>_<random>.cfg` so concurrent
//!   validations never collide
//! - Removal is tied to a guard's `Drop`, so it happens on every exit path,
//!   including spawn failures and timeouts

pub mod check;
pub mod disposable;

pub use check::CheckCommandValidator;
pub use disposable::DisposableFile;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Verdict of the proxy's own syntax checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub output: String,
    pub errors: String,
}

impl ValidationResult {
    /// The checker could not be run at all.
    pub fn invocation_error(errors: impl Into<String>) -> Self {
        Self {
            valid: false,
            output: String::new(),
            errors: errors.into(),
        }
    }
}

#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, config_text: &str) -> ValidationResult;
}
