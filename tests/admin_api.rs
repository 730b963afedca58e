//! Admin API routes exercised in-process.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use lb_reconciler::admin::{setup_admin_router, AdminState};
use lb_reconciler::model::BackendName;
use lb_reconciler::registry::{RegistryNode, StaticRegistry};

mod common;
use common::Fixture;

const KEY: &str = "test-admin-key";

fn router(fixture: &Fixture, nodes: Vec<RegistryNode>) -> Router {
    let state = AdminState {
        engine: Arc::new(fixture.engine()),
        registry: Arc::new(StaticRegistry::new(nodes)),
        registry_backend: BackendName::new("ddc_nodes_http").unwrap(),
        api_key: Arc::from(KEY),
    };
    setup_admin_router(state, Duration::from_secs(10))
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", KEY));
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_health_needs_no_key() {
    let fixture = Fixture::new();
    let app = router(&fixture, Vec::new());

    let req = Request::get("/health").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));

    let (_, body) = call(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["config_readable"], true);
    assert_eq!(body["runtime_socket"], false);
}

#[tokio::test]
async fn test_api_rejects_missing_or_wrong_key() {
    let fixture = Fixture::new();
    let app = router(&fixture, Vec::new());

    let req = Request::get("/api/v1/config").body(Body::empty()).unwrap();
    assert_eq!(call(&app, req).await.0, StatusCode::UNAUTHORIZED);

    let req = Request::get("/api/v1/config")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    assert_eq!(call(&app, req).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_config_lists_backends() {
    let fixture = Fixture::new();
    let app = router(&fixture, Vec::new());

    let (status, body) = call(&app, request(Method::GET, "/api/v1/config", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["backends"], json!(["pool_a", "pool_b", "ddc_nodes_http"]));
    assert_eq!(body["content"], common::SAMPLE_CONFIG);
    assert_eq!(body["hash"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_apply_mutation_body() {
    let fixture = Fixture::new();
    let app = router(&fixture, Vec::new());

    let body = json!({
        "action": "add",
        "backend": "pool_a",
        "server": {"name": "web-3", "address": "10.0.0.3", "port": 8080, "weight": 20}
    });
    let (status, outcome) = call(&app, request(Method::POST, "/api/v1/config", Some(body))).await;
    assert_eq!(status, StatusCode::OK, "{}", outcome);
    assert_eq!(outcome["success"], true);
    assert_eq!(outcome["path_used"], "file_patch");
    assert!(fixture
        .config_text()
        .contains("    server web_3 10.0.0.3:8080 check inter 5s rise 2 fall 3 weight 20\n"));
}

#[tokio::test]
async fn test_invalid_input_is_400() {
    let fixture = Fixture::new();
    let app = router(&fixture, Vec::new());

    let bad_port = json!({
        "action": "add",
        "backend": "pool_a",
        "server": {"name": "n3", "address": "10.0.0.3", "port": 70000}
    });
    let (status, body) = call(&app, request(Method::POST, "/api/v1/config", Some(bad_port))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("70000"));

    let bad_backend = request(Method::GET, "/api/v1/backends/pool%20a/servers", None);
    assert_eq!(call(&app, bad_backend).await.0, StatusCode::BAD_REQUEST);

    let bad_server = request(Method::DELETE, "/api/v1/backends/pool_a/servers/n%2F1", None);
    assert_eq!(call(&app, bad_server).await.0, StatusCode::BAD_REQUEST);

    assert_eq!(fixture.config_text(), common::SAMPLE_CONFIG);
}

#[tokio::test]
async fn test_server_routes() {
    let fixture = Fixture::new();
    let app = router(&fixture, Vec::new());

    let add = json!({"name": "n3", "address": "10.0.0.3", "port": 8080, "backup": true});
    let (status, _) = call(
        &app,
        request(Method::POST, "/api/v1/backends/pool_a/servers", Some(add)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &app,
        request(Method::DELETE, "/api/v1/backends/pool_a/servers/n1", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, servers) = call(
        &app,
        request(Method::GET, "/api/v1/backends/pool_a/servers", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = servers
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["n2", "n3"]);
    assert!(servers[1]["options"].as_str().unwrap().ends_with("backup"));
}

#[tokio::test]
async fn test_failed_outcome_is_422_and_unknown_backend_is_404() {
    let fixture = Fixture::new();
    let app = router(&fixture, Vec::new());

    let (status, outcome) = call(
        &app,
        request(Method::DELETE, "/api/v1/backends/pool_a/servers/n9", None),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(outcome["success"], false);

    let (status, _) = call(
        &app,
        request(Method::GET, "/api/v1/backends/pool_z/servers", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validate_and_reload() {
    let fixture = Fixture::new().rejecting();
    let app = router(&fixture, Vec::new());

    let (status, result) = call(
        &app,
        request(
            Method::POST,
            "/api/v1/config/validate",
            Some(json!({"config": "global\n"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(result["valid"], false);

    let (status, report) = call(&app, request(Method::POST, "/api/v1/config/reload", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["success"], true);
    assert_eq!(fixture.reloader.calls(), 1);
}

#[tokio::test]
async fn test_changes_are_newest_first() {
    let fixture = Fixture::new();
    let app = router(&fixture, Vec::new());

    for server in ["n1", "n2"] {
        call(
            &app,
            request(
                Method::DELETE,
                &format!("/api/v1/backends/pool_a/servers/{}", server),
                None,
            ),
        )
        .await;
    }

    let (status, changes) = call(
        &app,
        request(Method::GET, "/api/v1/config/changes?limit=1", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let changes = changes.as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["mutation"]["server"], "n2");
    assert_eq!(changes[0]["mutation"]["action"], "remove");
}

#[tokio::test]
async fn test_stats_without_socket_is_503() {
    let fixture = Fixture::new();
    let app = router(&fixture, Vec::new());

    let (status, _) = call(&app, request(Method::GET, "/api/v1/stats", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_registry_sync_adds_missing_nodes_once() {
    let fixture = Fixture::new();
    let nodes = vec![
        RegistryNode::new("10.1.0.20", 80),
        RegistryNode {
            name: Some("edge-2".to_string()),
            ..RegistryNode::new("10.1.0.21", 80)
        },
        RegistryNode {
            active: false,
            ..RegistryNode::new("10.1.0.22", 80)
        },
    ];
    let app = router(&fixture, nodes);

    let (status, report) = call(&app, request(Method::POST, "/api/v1/registry/sync", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["added"], json!(["node_10_1_0_20", "edge_2"]));
    assert_eq!(report["skipped"], json!([]));

    let (_, report) = call(&app, request(Method::POST, "/api/v1/registry/sync", None)).await;
    assert_eq!(report["added"], json!([]));
    assert_eq!(report["skipped"], json!(["node_10_1_0_20", "edge_2"]));
    assert!(!fixture.config_text().contains("10.1.0.22"));
}
