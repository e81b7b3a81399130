//! OpenAPI specification generation for the nexus API.
//!
//! Generates an OpenAPI 3.0 specification served at `/api/openapi.json` and
//! browsable through Swagger UI at `/docs`.

use axum::Json;
use utoipa::OpenApi;

use super::attendance::{
    HistoryResponse, MarkRequest, MarkResponse, RecordRequest, RecordResponse, ValidateRequest,
    ValidateResponse,
};
use super::error::ErrorResponse;
use super::health::HealthResponse;
use super::sessions::{
    SessionStatusResponse, StartSessionRequest, StopSessionRequest,
};

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Main OpenAPI document structure for nexus.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "nexus API",
        version = "0.1.0",
        description = r#"
# nexus API

nexus confirms physical co-presence between a host's broadcast beacon and a
participant's observed beacon reading, and records attendance for validated
readings.

## Overview

1. **Sessions**: a host starts a broadcast session for a beacon; at most one
   session is active per host at any time.
2. **Validation**: a participant submits the host beacon they observed plus
   their own beacon and signal strength; the reading is VALID when the beacon
   belongs to an active session and the signal meets the threshold.
3. **Attendance**: a VALID reading is persisted as exactly one attendance
   record per (participant, session); recording is idempotent.

Signal strengths are negative dBm values: readings numerically closer to
zero are stronger. The default threshold is -65, so -60 passes and -70
does not.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local nexus server")
    ),
    tags(
        (
            name = "system",
            description = "Health checks and system status"
        ),
        (
            name = "sessions",
            description = "Broadcast session lifecycle - one active session per host"
        ),
        (
            name = "attendance",
            description = "Proximity validation and idempotent attendance recording"
        )
    ),
    paths(
        // Health endpoints
        super::health::health_check,
        // Session endpoints
        super::sessions::start_session,
        super::sessions::stop_session,
        super::sessions::session_status,
        // Attendance endpoints
        super::attendance::validate_attendance,
        super::attendance::record_attendance,
        super::attendance::mark_attendance,
        super::attendance::attendance_history,
    ),
    components(
        schemas(
            // Core domain types
            nexus_core::BeaconId,
            nexus_core::Session,
            nexus_core::AttendanceRecord,
            nexus_core::AttendanceStatus,
            nexus_core::InvalidReason,
            // Error types
            ErrorResponse,
            // Health types
            HealthResponse,
            // Session types
            StartSessionRequest,
            StopSessionRequest,
            SessionStatusResponse,
            // Attendance types
            ValidateRequest,
            ValidateResponse,
            RecordRequest,
            RecordResponse,
            MarkRequest,
            MarkResponse,
            HistoryResponse,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "nexus API");
        assert!(!spec.paths.paths.is_empty());
    }

    #[test]
    fn test_openapi_spec_serializes() {
        let json = ApiDoc::openapi().to_pretty_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"nexus API\""));
    }
}
