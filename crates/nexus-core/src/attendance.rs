//! Idempotent attendance record creation and history queries.
//!
//! A successful proximity validation is persisted as exactly one
//! [`AttendanceRecord`] per (participant, session). Recording the same pair
//! again returns the existing record instead of erroring, so clients can
//! safely retry. Records are immutable here; later status corrections are
//! an external concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::Result;
use crate::store::Storage;

/// Recorded attendance status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    /// The participant was validated as present.
    #[default]
    Present,
    /// Marked late by an external correction flow.
    Late,
    /// Marked absent by an external correction flow.
    Absent,
}

/// One attendance event for a (participant, session) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    /// Stable record id.
    pub id: Uuid,

    /// The participant whose presence was validated.
    #[schema(example = "participant-7")]
    pub participant_id: String,

    /// The session the participant was validated against.
    pub session_id: Uuid,

    /// Recorded status.
    pub status: AttendanceStatus,

    /// When the record was created (UTC).
    pub recorded_at: DateTime<Utc>,
}

/// Persists successful validations as attendance events.
#[derive(Debug, Clone)]
pub struct AttendanceRecorder {
    storage: Storage,
}

impl AttendanceRecorder {
    /// Create a recorder over the given storage handle.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Record attendance for a participant against a session.
    ///
    /// Idempotent: when a record already exists for the pair, it is returned
    /// unchanged and no second row is created. The returned flag is `true`
    /// only when this call created the record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::NexusError::PersistenceError`] if the record
    /// cannot be persisted; callers must not assume attendance was recorded
    /// unless a record comes back.
    pub fn record(
        &self,
        participant_id: &str,
        session_id: Uuid,
        status: AttendanceStatus,
    ) -> Result<(AttendanceRecord, bool)> {
        let candidate = AttendanceRecord {
            id: Uuid::new_v4(),
            participant_id: participant_id.to_string(),
            session_id,
            status,
            recorded_at: Utc::now(),
        };

        let (record, created) = self.storage.create_attendance_if_absent(candidate)?;
        if created {
            info!(
                participant_id,
                %session_id,
                status = ?record.status,
                "attendance recorded"
            );
        }
        Ok((record, created))
    }

    /// Attendance history for one participant, newest first.
    #[must_use]
    pub fn history_for_participant(&self, participant_id: &str) -> Vec<AttendanceRecord> {
        self.storage.attendance_for_participant(participant_id)
    }

    /// Every attendance record, newest first.
    #[must_use]
    pub fn all_records(&self) -> Vec<AttendanceRecord> {
        self.storage.all_attendance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> AttendanceRecorder {
        AttendanceRecorder::new(Storage::in_memory())
    }

    #[test]
    fn test_record_creates_with_default_status() {
        let recorder = recorder();
        let session_id = Uuid::new_v4();

        let (record, created) = recorder
            .record("participant-1", session_id, AttendanceStatus::default())
            .unwrap();

        assert!(created);
        assert_eq!(record.participant_id, "participant-1");
        assert_eq!(record.session_id, session_id);
        assert_eq!(record.status, AttendanceStatus::Present);
    }

    #[test]
    fn test_record_twice_returns_same_record() {
        let recorder = recorder();
        let session_id = Uuid::new_v4();

        let (first, created_first) = recorder
            .record("participant-1", session_id, AttendanceStatus::Present)
            .unwrap();
        let (second, created_second) = recorder
            .record("participant-1", session_id, AttendanceStatus::Present)
            .unwrap();

        assert!(created_first);
        assert!(!created_second);
        assert_eq!(first, second);
        assert_eq!(recorder.all_records().len(), 1);
    }

    #[test]
    fn test_duplicate_keeps_original_status_and_timestamp() {
        let recorder = recorder();
        let session_id = Uuid::new_v4();

        let (original, _) = recorder
            .record("participant-1", session_id, AttendanceStatus::Present)
            .unwrap();
        // A retry with a different status must not mutate the stored record.
        let (replayed, created) = recorder
            .record("participant-1", session_id, AttendanceStatus::Late)
            .unwrap();

        assert!(!created);
        assert_eq!(replayed.status, AttendanceStatus::Present);
        assert_eq!(replayed.recorded_at, original.recorded_at);
    }

    #[test]
    fn test_history_per_participant_newest_first() {
        let recorder = recorder();
        let session_a = Uuid::new_v4();
        let session_b = Uuid::new_v4();

        recorder
            .record("participant-1", session_a, AttendanceStatus::Present)
            .unwrap();
        recorder
            .record("participant-1", session_b, AttendanceStatus::Present)
            .unwrap();
        recorder
            .record("participant-2", session_a, AttendanceStatus::Present)
            .unwrap();

        let history = recorder.history_for_participant("participant-1");
        assert_eq!(history.len(), 2);
        assert!(history[0].recorded_at >= history[1].recorded_at);

        assert_eq!(recorder.history_for_participant("participant-3").len(), 0);
        assert_eq!(recorder.all_records().len(), 3);
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&AttendanceStatus::Present).unwrap();
        assert_eq!(json, "\"PRESENT\"");
    }
}
