//! Axum HTTP server: routes, state, API-key gate.

pub mod handlers;
pub mod types;

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;

use crate::execution::ExecutionStrategy;
use crate::server::handlers::{concatenate_handler, health_handler};
use crate::server::types::ErrorBody;

/// Shared state for all handlers.
pub struct AppState {
    pub strategy: Arc<dyn ExecutionStrategy>,
    /// When set, the concatenate route requires a matching `x-api-key`.
    pub api_key: Option<SecretString>,
}

/// Assemble the application router. Health stays public; the
/// concatenate route sits behind the optional API-key gate.
pub fn build_router(state: Arc<AppState>) -> Router {
    let public = Router::new().route("/api/health", get(health_handler));

    let protected = Router::new()
        .route("/v1/audio/concatenate", post(concatenate_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        // Requests are small JSON bodies; anything bigger is not ours.
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Reject requests without the configured API key (constant-time
/// comparison). A no-op when no key is configured.
async fn require_api_key(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let Some(ref expected) = state.api_key else {
        return next.run(request).await;
    };

    if let Some(provided) = headers.get("x-api-key")
        && let Ok(provided) = provided.to_str()
        && bool::from(
            provided
                .as_bytes()
                .ct_eq(expected.expose_secret().as_bytes()),
        )
    {
        return next.run(request).await;
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            error: "Invalid or missing API key".to_string(),
        }),
    )
        .into_response()
}
