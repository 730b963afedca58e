//! Point-in-time view of the configuration text.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Configuration text plus its content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSnapshot {
    pub content: String,
    /// Lowercase hex SHA-256 of `content`.
    pub hash: String,
}

impl ConfigSnapshot {
    pub fn new(content: String) -> Self {
        let hash = content_hash(&content);
        Self { content, hash }
    }

    pub fn matches(&self, content: &str) -> bool {
        self.hash == content_hash(content)
    }
}

pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
