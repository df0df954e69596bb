//! Axum route handlers for the capabilities server.
//!
//! # Routes
//!
//! - `GET /health`: Returns `{"status": "ok", "version": "..."}`
//! - `GET /{*path}.json`: Capabilities document of the resource at `/{path}`

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::trace::TraceLayer;

use super::gateway::{GatewayError, ResponseGateway};

/// Extension under which capabilities resources are served.
pub const JSON_EXTENSION: &str = ".json";

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ResponseGateway>,
}

impl AppState {
    pub fn new(gateway: ResponseGateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/{*path}", get(capabilities_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health: liveness check.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "sources": state.gateway.registry().len(),
    }))
}

/// GET /{*path}.json: capabilities of one resource.
///
/// Aggregation calls sources synchronously, so it runs on the blocking pool.
async fn capabilities_handler(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let Some(resource_path) = path.strip_suffix(JSON_EXTENSION) else {
        return (StatusCode::NOT_FOUND, format!("No handler for /{}", path)).into_response();
    };

    let gateway = state.gateway.clone();
    let resource_path = resource_path.to_string();
    let result = tokio::task::spawn_blocking(move || gateway.handle(&resource_path)).await;

    match result {
        Ok(Ok(document)) => match document.to_json() {
            Ok(body) => (
                [(header::CONTENT_TYPE, "application/json; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize capabilities");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        },
        Ok(Err(error)) => error.into_response(),
        Err(join_error) => {
            tracing::error!(error = %join_error, "capabilities aggregation panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Aggregation failed: {}", join_error),
            )
                .into_response()
        }
    }
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::InvalidPattern(_) | GatewayError::DuplicateNamespace(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "capabilities request failed");
        }
        (status, self.to_string()).into_response()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
