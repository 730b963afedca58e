//! Domain model for backend reconciliation.
//!
//! # Data Flow
//! ```text
//! desired-state source (admin API, registry)
//!     → names.rs (BackendName / ServerName, validated)
//!     → server.rs (ServerSpec, validated)
//!     → mutation.rs (Mutation: Add | Remove)
//!     → engine applies it
//!     → outcome.rs (ReconciliationOutcome)
//! ```
//!
//! # Design Decisions
//! - Every value is validated when it is constructed, never at point of use
//! - Serde goes through the same constructors (`try_from`), so JSON input
//!   can never produce an unvalidated value
//! - Server names have hyphens rewritten to underscores because the
//!   runtime command grammar rejects them in identifiers

pub mod mutation;
pub mod names;
pub mod outcome;
pub mod server;

pub use mutation::Mutation;
pub use names::{normalize_server_name, BackendName, ServerName};
pub use outcome::{PathUsed, ReconciliationOutcome};
pub use server::ServerSpec;

use thiserror::Error;

/// Construction-time validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("{0} name must not be empty")]
    EmptyName(&'static str),

    #[error("{field} name '{value}' contains illegal character {character:?}")]
    IllegalCharacter {
        field: &'static str,
        value: String,
        character: char,
    },

    #[error("invalid server address '{0}'")]
    InvalidAddress(String),

    #[error("port {0} is out of range 1-65535")]
    InvalidPort(u32),

    #[error("weight {0} is out of range 1-256")]
    InvalidWeight(u32),
}
