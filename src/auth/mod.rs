use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;

/// Request headers that may carry the API key, in lookup order
pub const API_KEY_HEADERS: [&str; 2] = ["API_KEY", "X-API-Key"];

pub struct AuthService {
    api_key: Option<Arc<str>>,
}

impl AuthService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            api_key: config.api_key.as_deref().map(Arc::from),
        }
    }

    /// True only when a secret is configured and `key` equals it
    pub fn validate_key(&self, key: Option<&str>) -> bool {
        match (self.api_key.as_deref(), key) {
            (Some(expected), Some(provided)) => {
                expected.as_bytes().ct_eq(provided.as_bytes()).into()
            }
            _ => false,
        }
    }
}

fn provided_key(headers: &HeaderMap) -> Option<&str> {
    API_KEY_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
}

pub async fn auth_middleware(
    auth_service: Arc<AuthService>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if auth_service.validate_key(provided_key(&headers)) {
        next.run(request).await
    } else {
        tracing::debug!(path = %request.uri().path(), "Rejected request without a valid API key");
        (StatusCode::FORBIDDEN, Json(json!({ "error": "Unauthorized" }))).into_response()
    }
}
