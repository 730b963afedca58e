//! HAProxy control plane: backend reconciliation engine.

pub mod model;
pub mod runtime;
pub mod store;
pub mod validator;
pub mod reload;
pub mod changelog;
pub mod engine;
pub mod registry;

pub mod config;
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use config::ControlPlaneConfig;
pub use engine::ReconciliationEngine;
pub use lifecycle::Shutdown;
pub use model::{Mutation, PathUsed, ReconciliationOutcome};
