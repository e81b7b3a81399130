//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `sessions` - Broadcast session lifecycle
//! - `attendance` - Proximity validation and attendance recording
//! - `health` - Service health checks
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::SharedState;

pub mod attendance;
pub mod error;
pub mod health;
pub mod openapi;
pub mod sessions;

// Re-export commonly used types
#[allow(unused_imports)]
pub use error::{ApiError, ApiResult, ErrorResponse};

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                    - Health check
/// /docs                      - Swagger UI
/// /api
/// ├── /sessions
/// │   ├── /start             - Start a broadcast session
/// │   ├── /stop              - Stop a broadcast session
/// │   └── /status            - List active sessions
/// ├── /attendance
/// │   ├── /validate          - Proximity validation
/// │   ├── /record            - Idempotent attendance recording
/// │   ├── /mark              - Validate + record in one step
/// │   └── /history           - Attendance history
/// └── /openapi.json          - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .route("/openapi.json", get(openapi::get_openapi_spec))
                .nest("/sessions", sessions::router())
                .nest("/attendance", attendance::router()),
        )
        .merge(
            SwaggerUi::new("/docs").url("/docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
