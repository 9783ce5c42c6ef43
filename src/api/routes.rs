use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::auth::{auth_middleware, AuthService};

use super::handlers::{
    analyze, export_logs, generate_logs, get_aggregate, get_endpoint_stats, get_session_stats,
    health_check, index, list_logs, predict, AppState,
};

pub fn create_api_router(state: Arc<AppState>, auth_service: Arc<AuthService>) -> Router {
    let protected_routes = Router::new()
        .route("/analyze", get(analyze))
        .route("/api/logs", get(list_logs))
        .route("/api/logs/export", get(export_logs))
        .route("/api/logs/generate", post(generate_logs))
        .route("/api/aggregate", get(get_aggregate))
        .route("/api/endpoint", get(get_endpoint_stats))
        .route("/api/sessions", get(get_session_stats))
        .route("/api/predict", get(predict))
        .route_layer(middleware::from_fn(move |headers, req, next| {
            let auth = Arc::clone(&auth_service);
            auth_middleware(auth, headers, req, next)
        }))
        .with_state(state);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
}
