//! Session lifecycle API endpoints.
//!
//! A host starts a broadcast session for a beacon, stops it, and queries
//! which of its sessions are currently active. Starting a new session
//! automatically supersedes whatever the host had active before.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use nexus_core::{BeaconId, Session};

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// Creates the sessions router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/start", post(start_session))
        .route("/stop", post(stop_session))
        .route("/status", get(session_status))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for starting a session.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "host_id": "host-42",
    "beacon": "AA:BB:CC:DD:EE:FF"
}))]
pub struct StartSessionRequest {
    /// The host opening the session.
    #[schema(example = "host-42")]
    pub host_id: String,

    /// Raw beacon identifier; separators and case are normalized away.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub beacon: String,
}

/// Request body for stopping a session.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "host_id": "host-42",
    "beacon": null
}))]
pub struct StopSessionRequest {
    /// The host whose session to stop.
    #[schema(example = "host-42")]
    pub host_id: String,

    /// Raw beacon identifier of the specific session to stop. When omitted,
    /// whichever session the host currently has active is stopped.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub beacon: Option<String>,
}

/// Query parameters for the session status endpoint.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct SessionStatusQuery {
    /// Restrict to one host's sessions. When omitted, all active sessions
    /// are returned.
    #[param(example = "host-42")]
    pub host_id: Option<String>,
}

/// Session status response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionStatusResponse {
    /// Currently active sessions.
    pub sessions: Vec<Session>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Start (or restart) a broadcast session.
///
/// Any session the host already has active is deactivated in the same
/// atomic step; a host never ends up with two active sessions.
#[utoipa::path(
    post,
    path = "/sessions/start",
    tag = "sessions",
    operation_id = "startSession",
    summary = "Start a broadcast session",
    description = "Activates the (host, beacon) session, deactivating any other \
        session the host had active. Restarting the same pair reuses the \
        existing session rather than creating a duplicate.",
    request_body = StartSessionRequest,
    responses(
        (status = 200, description = "Session started", body = Session),
        (status = 400, description = "Malformed beacon identifier"),
        (status = 404, description = "Unknown host"),
        (status = 409, description = "Concurrent mutation lost the race")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    Json(request): Json<StartSessionRequest>,
) -> ApiResult<Json<Session>> {
    let state_guard = state.read().await;

    if !state_guard.identity.exists_host(&request.host_id) {
        return Err(ApiError::NotFound {
            error_code: "unknown_host".to_string(),
            message: format!("Unknown host: '{}'", request.host_id),
        });
    }

    let beacon = BeaconId::parse(&request.beacon)?;
    let session = state_guard.registry.start(&request.host_id, &beacon)?;

    Ok(Json(session))
}

/// Stop a broadcast session.
#[utoipa::path(
    post,
    path = "/sessions/stop",
    tag = "sessions",
    operation_id = "stopSession",
    summary = "Stop a broadcast session",
    description = "Deactivates the host's active session. With a beacon, only \
        that specific session is stopped; without one, whichever session the \
        host currently has active.",
    request_body = StopSessionRequest,
    responses(
        (status = 200, description = "Session stopped", body = Session),
        (status = 400, description = "Malformed beacon identifier"),
        (status = 404, description = "Unknown host or no active session")
    )
)]
pub async fn stop_session(
    State(state): State<SharedState>,
    Json(request): Json<StopSessionRequest>,
) -> ApiResult<Json<Session>> {
    let state_guard = state.read().await;

    if !state_guard.identity.exists_host(&request.host_id) {
        return Err(ApiError::NotFound {
            error_code: "unknown_host".to_string(),
            message: format!("Unknown host: '{}'", request.host_id),
        });
    }

    let beacon = request
        .beacon
        .as_deref()
        .map(BeaconId::parse)
        .transpose()?;
    let session = state_guard
        .registry
        .stop(&request.host_id, beacon.as_ref())?;

    Ok(Json(session))
}

/// List currently active sessions.
#[utoipa::path(
    get,
    path = "/sessions/status",
    tag = "sessions",
    operation_id = "sessionStatus",
    summary = "List active sessions",
    description = "Returns currently active sessions, optionally restricted to \
        one host.",
    params(SessionStatusQuery),
    responses(
        (status = 200, description = "Active sessions", body = SessionStatusResponse)
    )
)]
pub async fn session_status(
    State(state): State<SharedState>,
    Query(query): Query<SessionStatusQuery>,
) -> ApiResult<Json<SessionStatusResponse>> {
    let state_guard = state.read().await;
    let sessions = state_guard.registry.list_active(query.host_id.as_deref());
    Ok(Json(SessionStatusResponse { sessions }))
}
