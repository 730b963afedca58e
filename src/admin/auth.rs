use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use subtle::ConstantTimeEq;

use crate::admin::AdminState;

/// Constant-time comparison of a presented key against the configured one.
fn key_matches(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

pub async fn admin_auth_middleware(
    State(state): State<AdminState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(token) if key_matches(token, &state.api_key) => Ok(next.run(request).await),
        _ => {
            tracing::warn!(path = %request.uri().path(), "Rejected admin request without valid API key");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_matches_exact_only() {
        assert!(key_matches("test-admin-key", "test-admin-key"));
        assert!(!key_matches("test-admin-kex", "test-admin-key"));
        assert!(!key_matches("test-admin", "test-admin-key"));
        assert!(!key_matches("", "test-admin-key"));
    }
}
