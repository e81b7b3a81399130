//! Attendance API endpoints.
//!
//! Validation decides VALID/INVALID for an observed beacon reading and never
//! errors on malformed input; recording persists a successful validation as
//! exactly one attendance record per (participant, session).

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use nexus_core::{
    AttendanceRecord, AttendanceStatus, InvalidReason, NotificationEvent, ValidationOutcome,
};

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// Creates the attendance router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/validate", post(validate_attendance))
        .route("/record", post(record_attendance))
        .route("/mark", post(mark_attendance))
        .route("/history", get(attendance_history))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for proximity validation.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "host_beacon": "AA:BB:CC:DD:EE:FF",
    "participant_beacon": "aa-bb-cc-dd-ee-ff",
    "signal": -60
}))]
pub struct ValidateRequest {
    /// Raw host beacon identifier.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub host_beacon: String,

    /// Raw participant beacon identifier.
    #[schema(example = "aa-bb-cc-dd-ee-ff")]
    pub participant_beacon: String,

    /// Raw signal reading; a number or a numeric string.
    #[schema(value_type = Object, example = -60)]
    pub signal: serde_json::Value,
}

/// Proximity validation response. The result is always definite.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "result": "VALID",
    "reason": null,
    "signal_dbm": -60,
    "threshold_dbm": -65,
    "checked_at_utc": "2025-03-15T10:30:00Z"
}))]
pub struct ValidateResponse {
    /// `VALID` or `INVALID`.
    #[schema(example = "VALID")]
    pub result: String,

    /// Reason code when INVALID.
    pub reason: Option<InvalidReason>,

    /// Normalized participant signal, when it parsed.
    #[schema(example = -60)]
    pub signal_dbm: Option<i16>,

    /// The threshold the signal was compared against.
    #[schema(example = -65)]
    pub threshold_dbm: i16,

    /// When the check was performed.
    #[schema(example = "2025-03-15T10:30:00Z")]
    pub checked_at_utc: String,
}

impl ValidateResponse {
    fn from_outcome(outcome: ValidationOutcome, threshold: i16) -> Self {
        match outcome {
            ValidationOutcome::Valid { signal } => Self {
                result: "VALID".to_string(),
                reason: None,
                signal_dbm: Some(signal),
                threshold_dbm: threshold,
                checked_at_utc: Utc::now().to_rfc3339(),
            },
            ValidationOutcome::Invalid { reason } => Self {
                result: "INVALID".to_string(),
                reason: Some(reason),
                signal_dbm: None,
                threshold_dbm: threshold,
                checked_at_utc: Utc::now().to_rfc3339(),
            },
        }
    }
}

/// Request body for recording attendance against a known session.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "participant_id": "participant-7",
    "session_id": "0195f7a0-5c1e-7c3a-bb1a-111111111111",
    "status": "PRESENT"
}))]
pub struct RecordRequest {
    /// The participant to record.
    #[schema(example = "participant-7")]
    pub participant_id: String,

    /// The session the participant was validated against.
    pub session_id: Uuid,

    /// Status to record; defaults to PRESENT.
    #[serde(default)]
    pub status: AttendanceStatus,
}

/// Response after recording attendance.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordResponse {
    /// The attendance record (new or pre-existing).
    pub record: AttendanceRecord,

    /// True when this call created the record; false when it already
    /// existed and was returned unchanged.
    #[schema(example = true)]
    pub created: bool,
}

/// Request body for the combined validate-and-record flow.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "participant_id": "participant-7",
    "host_beacon": "AA:BB:CC:DD:EE:FF",
    "participant_beacon": "aa-bb-cc-dd-ee-ff",
    "signal": -60
}))]
pub struct MarkRequest {
    /// The participant marking attendance.
    #[schema(example = "participant-7")]
    pub participant_id: String,

    /// Raw host beacon identifier.
    #[schema(example = "AA:BB:CC:DD:EE:FF")]
    pub host_beacon: String,

    /// Raw participant beacon identifier.
    #[schema(example = "aa-bb-cc-dd-ee-ff")]
    pub participant_beacon: String,

    /// Raw signal reading; a number or a numeric string.
    #[schema(value_type = Object, example = -60)]
    pub signal: serde_json::Value,
}

/// Response for the combined validate-and-record flow.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkResponse {
    /// `VALID` or `INVALID`.
    #[schema(example = "VALID")]
    pub result: String,

    /// Reason code when INVALID.
    pub reason: Option<InvalidReason>,

    /// The attendance record, present only on VALID.
    pub record: Option<AttendanceRecord>,
}

/// Query parameters for attendance history.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Restrict to one participant's records. When omitted, all records are
    /// returned.
    #[param(example = "participant-7")]
    pub participant_id: Option<String>,
}

/// Attendance history response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    /// Matching attendance records, newest first.
    pub records: Vec<AttendanceRecord>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Validate a participant's proximity to a host beacon.
///
/// Never fails on malformed input: bad identifiers or signals resolve to an
/// INVALID result with a reason code.
#[utoipa::path(
    post,
    path = "/attendance/validate",
    tag = "attendance",
    operation_id = "validateAttendance",
    summary = "Validate proximity to an active session",
    description = "Normalizes the host and participant beacon readings, checks \
        the host beacon belongs to an active session, and compares the signal \
        against the threshold. Always returns a definite VALID or INVALID.",
    request_body = ValidateRequest,
    responses(
        (status = 200, description = "Validation completed", body = ValidateResponse)
    )
)]
pub async fn validate_attendance(
    State(state): State<SharedState>,
    Json(request): Json<ValidateRequest>,
) -> ApiResult<Json<ValidateResponse>> {
    let state_guard = state.read().await;

    let outcome = state_guard.validator.validate(
        &request.host_beacon,
        &request.participant_beacon,
        &request.signal,
    );

    Ok(Json(ValidateResponse::from_outcome(
        outcome,
        state_guard.validator.threshold(),
    )))
}

/// Record attendance for a participant against a session.
#[utoipa::path(
    post,
    path = "/attendance/record",
    tag = "attendance",
    operation_id = "recordAttendance",
    summary = "Record attendance (idempotent)",
    description = "Creates one attendance record per (participant, session). \
        Calling again with the same pair returns the existing record with \
        created = false.",
    request_body = RecordRequest,
    responses(
        (status = 200, description = "Record created or returned", body = RecordResponse),
        (status = 404, description = "Unknown participant or session")
    )
)]
pub async fn record_attendance(
    State(state): State<SharedState>,
    Json(request): Json<RecordRequest>,
) -> ApiResult<Json<RecordResponse>> {
    let state_guard = state.read().await;

    if !state_guard.identity.exists_participant(&request.participant_id) {
        return Err(ApiError::NotFound {
            error_code: "unknown_participant".to_string(),
            message: format!("Unknown participant: '{}'", request.participant_id),
        });
    }

    if state_guard.registry.find_session(request.session_id).is_none() {
        return Err(ApiError::NotFound {
            error_code: "unknown_session".to_string(),
            message: format!("Unknown session: '{}'", request.session_id),
        });
    }

    let (record, created) =
        state_guard
            .recorder
            .record(&request.participant_id, request.session_id, request.status)?;

    Ok(Json(RecordResponse { record, created }))
}

/// Validate proximity and record attendance in one call.
#[utoipa::path(
    post,
    path = "/attendance/mark",
    tag = "attendance",
    operation_id = "markAttendance",
    summary = "Validate and record in one step",
    description = "Runs the proximity validation; on VALID, resolves the active \
        session broadcasting the host beacon and records attendance for the \
        participant. On INVALID, nothing is recorded and the reason is \
        returned.",
    request_body = MarkRequest,
    responses(
        (status = 200, description = "Validation completed", body = MarkResponse),
        (status = 404, description = "Unknown participant")
    )
)]
pub async fn mark_attendance(
    State(state): State<SharedState>,
    Json(request): Json<MarkRequest>,
) -> ApiResult<Json<MarkResponse>> {
    let state_guard = state.read().await;

    if !state_guard.identity.exists_participant(&request.participant_id) {
        return Err(ApiError::NotFound {
            error_code: "unknown_participant".to_string(),
            message: format!("Unknown participant: '{}'", request.participant_id),
        });
    }

    let outcome = state_guard.validator.validate(
        &request.host_beacon,
        &request.participant_beacon,
        &request.signal,
    );

    let ValidationOutcome::Valid { .. } = outcome else {
        return Ok(Json(MarkResponse {
            result: "INVALID".to_string(),
            reason: outcome.reason(),
            record: None,
        }));
    };

    // The validator just saw the beacon active; if the session stopped in
    // the meantime, the reading no longer proves co-presence.
    let host_beacon = nexus_core::BeaconId::parse(&request.host_beacon)
        .map_err(ApiError::from)?;
    let Some(session) = state_guard.registry.active_session_for_beacon(&host_beacon) else {
        return Ok(Json(MarkResponse {
            result: "INVALID".to_string(),
            reason: Some(InvalidReason::NoActiveSession),
            record: None,
        }));
    };

    let (record, created) = state_guard.recorder.record(
        &request.participant_id,
        session.id,
        AttendanceStatus::Present,
    )?;

    if created {
        state_guard.notifier.notify(&NotificationEvent::AttendanceMarked {
            participant_id: record.participant_id.clone(),
            session_id: record.session_id,
        });
    }

    Ok(Json(MarkResponse {
        result: "VALID".to_string(),
        reason: None,
        record: Some(record),
    }))
}

/// Query attendance history.
#[utoipa::path(
    get,
    path = "/attendance/history",
    tag = "attendance",
    operation_id = "attendanceHistory",
    summary = "Query attendance records",
    description = "Returns attendance records newest first, optionally \
        restricted to one participant.",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Matching records", body = HistoryResponse)
    )
)]
pub async fn attendance_history(
    State(state): State<SharedState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<HistoryResponse>> {
    let state_guard = state.read().await;

    let records = match query.participant_id.as_deref() {
        Some(participant_id) => state_guard.recorder.history_for_participant(participant_id),
        None => state_guard.recorder.all_records(),
    };

    Ok(Json(HistoryResponse { records }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_request_accepts_number_or_string_signal() {
        let request: ValidateRequest = serde_json::from_str(
            r#"{"host_beacon": "AABBCCDDEEFF", "participant_beacon": "AABBCCDDEEFF", "signal": -60}"#,
        )
        .unwrap();
        assert!(request.signal.is_number());

        let request: ValidateRequest = serde_json::from_str(
            r#"{"host_beacon": "AABBCCDDEEFF", "participant_beacon": "AABBCCDDEEFF", "signal": "-60"}"#,
        )
        .unwrap();
        assert!(request.signal.is_string());
    }

    #[test]
    fn test_record_request_status_defaults_to_present() {
        let request: RecordRequest = serde_json::from_str(
            r#"{"participant_id": "participant-1", "session_id": "0195f7a0-5c1e-7c3a-bb1a-111111111111"}"#,
        )
        .unwrap();
        assert_eq!(request.status, AttendanceStatus::Present);
    }

    #[test]
    fn test_validate_response_shape() {
        let response =
            ValidateResponse::from_outcome(ValidationOutcome::Valid { signal: -60 }, -65);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"result\":\"VALID\""));
        assert!(json.contains("\"signal_dbm\":-60"));

        let response = ValidateResponse::from_outcome(
            ValidationOutcome::Invalid {
                reason: InvalidReason::NoActiveSession,
            },
            -65,
        );
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"result\":\"INVALID\""));
        assert!(json.contains("\"reason\":\"no_active_session\""));
    }
}
