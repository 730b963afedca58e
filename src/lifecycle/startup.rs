//! Startup orchestration.
//!
//! # Responsibilities
//! - Build every engine collaborator from validated configuration
//! - Wire the admin API state
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - A missing live config file is only a warning; requests report it

use std::sync::Arc;

use thiserror::Error;

use crate::admin::AdminState;
use crate::changelog::JsonlChangeLog;
use crate::config::schema::PLACEHOLDER_API_KEY;
use crate::config::ControlPlaneConfig;
use crate::engine::ReconciliationEngine;
use crate::model::{BackendName, ModelError};
use crate::registry::StaticRegistry;
use crate::reload::CommandReloader;
use crate::runtime::{SocketChannel, SocketEndpoint};
use crate::store::ConfigStore;
use crate::validator::CheckCommandValidator;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid runtime socket '{socket}': {reason}")]
    Socket { socket: String, reason: String },

    #[error("invalid registry backend: {0}")]
    RegistryBackend(#[from] ModelError),
}

pub fn build_engine(config: &ControlPlaneConfig) -> Result<ReconciliationEngine, StartupError> {
    let endpoint: SocketEndpoint =
        config
            .runtime
            .socket
            .parse()
            .map_err(|reason| StartupError::Socket {
                socket: config.runtime.socket.clone(),
                reason,
            })?;
    let channel = SocketChannel::new(endpoint, config.runtime.timeout());

    let store = ConfigStore::new(&config.haproxy.config_path);
    if !store.exists() {
        tracing::warn!(
            path = %store.path().display(),
            "Live configuration file not found; file-patch path will fail until it exists"
        );
    }

    let validator = CheckCommandValidator::new(
        config.haproxy.binary.clone(),
        config.haproxy.scratch_dir.clone(),
        config.haproxy.validate_timeout(),
    );
    let reloader = CommandReloader::new(
        config.haproxy.reload_command.clone(),
        config.haproxy.reload_timeout(),
    );
    let audit = JsonlChangeLog::new(&config.changelog.path);

    tracing::info!(
        runtime = %channel.endpoint(),
        config_path = %store.path().display(),
        changelog = %audit.path().display(),
        "Reconciliation engine ready"
    );

    Ok(ReconciliationEngine::new(
        Arc::new(channel),
        Arc::new(store),
        Arc::new(validator),
        Arc::new(reloader),
        Arc::new(audit),
    ))
}

pub fn build_admin_state(
    config: &ControlPlaneConfig,
    engine: Arc<ReconciliationEngine>,
) -> Result<AdminState, StartupError> {
    if config.admin.api_key == PLACEHOLDER_API_KEY {
        tracing::warn!("Admin API is using the placeholder API key; set ADMIN_API_KEY");
    }

    Ok(AdminState {
        engine,
        registry: Arc::new(StaticRegistry::new(config.registry.nodes.clone())),
        registry_backend: BackendName::new(config.registry.backend.as_str())?,
        api_key: Arc::from(config.admin.api_key.as_str()),
    })
}
