//! Admin HTTP API.
//!
//! # Data Flow
//! ```text
//! request
//!     → TraceLayer → request_id.rs → TimeoutLayer
//!     → auth.rs (bearer API key, /api/v1 only)
//!     → handlers.rs
//!     → ReconciliationEngine / registry sync
//!     → JSON (200, or 422 carrying a failed outcome)
//! ```
//!
//! # Design Decisions
//! - Handlers are thin: every change goes through `engine.apply`
//! - `/health` is unauthenticated so orchestrators can probe it
//! - Malformed input is 400 before the engine is touched

pub mod auth;
pub mod handlers;
pub mod request_id;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::engine::ReconciliationEngine;
use crate::model::BackendName;
use crate::registry::NodeRegistry;

use self::auth::admin_auth_middleware;
use self::handlers::*;
use self::request_id::request_id_middleware;

/// Shared handler state.
#[derive(Clone)]
pub struct AdminState {
    pub engine: Arc<ReconciliationEngine>,
    pub registry: Arc<dyn NodeRegistry>,
    /// Backend that registry nodes are synced into.
    pub registry_backend: BackendName,
    pub api_key: Arc<str>,
}

#[allow(deprecated)]
pub fn setup_admin_router(state: AdminState, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/api/v1/config", get(get_config).post(apply_mutation))
        .route("/api/v1/config/validate", post(validate_candidate))
        .route("/api/v1/config/reload", post(reload))
        .route("/api/v1/config/changes", get(get_changes))
        .route(
            "/api/v1/backends/{backend}/servers",
            get(list_servers).post(add_server),
        )
        .route(
            "/api/v1/backends/{backend}/servers/{server}",
            delete(remove_server),
        )
        .route("/api/v1/stats", get(get_stats))
        .route("/api/v1/registry/sync", post(sync_registry))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Serve the admin API until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Admin API starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}
