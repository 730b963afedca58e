use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::engine::ReconcileError;
use crate::model::{BackendName, Mutation, ReconciliationOutcome, ServerName, ServerSpec};
use crate::registry::{self, RegistryError};
use crate::runtime::ChannelError;
use crate::store::{patch, PatchError, StoreError};

pub const DEFAULT_CHANGES_LIMIT: usize = 50;
pub const MAX_CHANGES_LIMIT: usize = 1000;

/// Error body returned for requests that never reached the engine.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            ApiError::BadGateway(m) => (StatusCode::BAD_GATEWAY, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError::Unavailable(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(e: ReconcileError) -> Self {
        match e {
            ReconcileError::Store(e) => e.into(),
            ReconcileError::Patch(PatchError::BackendNotFound(_)) => ApiError::NotFound(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ChannelError> for ApiError {
    fn from(e: ChannelError) -> Self {
        match e {
            ChannelError::Unavailable(_) => ApiError::Unavailable(e.to_string()),
            _ => ApiError::BadGateway(e.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Backend(e) => e.into(),
            RegistryError::Unavailable(_) => ApiError::Unavailable(e.to_string()),
        }
    }
}

fn backend_param(raw: String) -> Result<BackendName, ApiError> {
    BackendName::new(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// 200 with the outcome on success, 422 with the same body on failure.
fn outcome_response(outcome: ReconciliationOutcome) -> Response {
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(outcome)).into_response()
}

fn verdict_status(success: bool) -> StatusCode {
    if success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub config_readable: bool,
    pub runtime_socket: bool,
}

pub async fn health(State(state): State<AdminState>) -> Response {
    let config_readable = state.engine.read().await.is_ok();
    let runtime_socket = state.engine.runtime_present();

    let (status, label) = match (config_readable, runtime_socket) {
        (true, true) => (StatusCode::OK, "healthy"),
        (true, false) => (StatusCode::OK, "degraded"),
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    (
        status,
        Json(HealthStatus {
            status: label,
            version: env!("CARGO_PKG_VERSION"),
            config_readable,
            runtime_socket,
        }),
    )
        .into_response()
}

#[derive(Serialize)]
pub struct ConfigView {
    pub path: String,
    pub hash: String,
    pub backends: Vec<String>,
    pub content: String,
}

pub async fn get_config(State(state): State<AdminState>) -> Result<Json<ConfigView>, ApiError> {
    let snapshot = state.engine.read().await?;
    Ok(Json(ConfigView {
        path: state.engine.store().path().display().to_string(),
        hash: snapshot.hash,
        backends: patch::list_backends(&snapshot.content),
        content: snapshot.content,
    }))
}

pub async fn apply_mutation(
    State(state): State<AdminState>,
    body: Result<Json<Mutation>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(mutation) = body?;
    Ok(outcome_response(state.engine.apply(mutation).await))
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub config: String,
}

pub async fn validate_candidate(
    State(state): State<AdminState>,
    body: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body?;
    let result = state.engine.validate(&request.config).await;
    Ok((verdict_status(result.valid), Json(result)).into_response())
}

pub async fn reload(State(state): State<AdminState>) -> Response {
    let report = state.engine.reload().await;
    (verdict_status(report.success), Json(report)).into_response()
}

#[derive(Deserialize)]
pub struct ChangesQuery {
    pub limit: Option<usize>,
}

pub async fn get_changes(
    State(state): State<AdminState>,
    Query(query): Query<ChangesQuery>,
) -> Result<Response, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_CHANGES_LIMIT)
        .min(MAX_CHANGES_LIMIT);
    let records = state
        .engine
        .recent_changes(limit)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(records).into_response())
}

pub async fn list_servers(
    State(state): State<AdminState>,
    Path(backend): Path<String>,
) -> Result<Response, ApiError> {
    let backend = backend_param(backend)?;
    let servers = state.engine.servers(&backend).await?;
    Ok(Json(servers).into_response())
}

pub async fn add_server(
    State(state): State<AdminState>,
    Path(backend): Path<String>,
    body: Result<Json<ServerSpec>, JsonRejection>,
) -> Result<Response, ApiError> {
    let backend = backend_param(backend)?;
    let Json(server) = body?;
    Ok(outcome_response(
        state.engine.apply(Mutation::add(backend, server)).await,
    ))
}

pub async fn remove_server(
    State(state): State<AdminState>,
    Path((backend, server)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let backend = backend_param(backend)?;
    let server = ServerName::new(server).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(outcome_response(
        state.engine.apply(Mutation::remove(backend, server)).await,
    ))
}

pub async fn get_stats(State(state): State<AdminState>) -> Result<Response, ApiError> {
    let stats = state.engine.stats().await?;
    Ok(Json(stats).into_response())
}

pub async fn sync_registry(State(state): State<AdminState>) -> Result<Response, ApiError> {
    let report = registry::sync_backend(
        &state.engine,
        state.registry.as_ref(),
        &state.registry_backend,
    )
    .await?;
    Ok(Json(report).into_response())
}
