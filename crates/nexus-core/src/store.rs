//! Persistent storage for sessions and attendance records.
//!
//! The in-memory tables are the source of truth; each committed change is
//! snapshotted to JSON files under the data directory so state survives a
//! restart. Constructed without a data directory the store is purely
//! in-memory, which is the configuration tests use.
//!
//! Two uniqueness constraints are enforced here rather than in application
//! logic, so races across writers cannot violate them:
//!
//! - at most one active session per host
//! - at most one attendance record per (participant, session)
//!
//! The session table carries a commit version. Writers read a snapshot,
//! mutate it, and commit with the version they read; a commit against a
//! stale version fails with [`NexusError::StorageConflict`] and the caller
//! retries against a fresh snapshot.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attendance::AttendanceRecord;
use crate::beacon::BeaconId;
use crate::error::{NexusError, Result};
use crate::session::Session;

const SESSIONS_FILE: &str = "sessions.json";
const ATTENDANCE_FILE: &str = "attendance.json";

/// Storage backend for session and attendance data.
///
/// Cheap to clone; all clones share the same tables.
#[derive(Debug, Clone)]
pub struct Storage {
    inner: Arc<StorageInner>,
}

#[derive(Debug)]
struct StorageInner {
    data_dir: Option<PathBuf>,
    sessions: Mutex<SessionTable>,
    attendance: Mutex<Vec<AttendanceRecord>>,
}

/// Session rows plus the commit version guarding them.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionTable {
    version: u64,
    rows: Vec<Session>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A poisoned lock means a writer panicked mid-mutation; the tables are
    // plain data and the last commit was persisted whole, so recover the
    // guard rather than wedging every subsequent caller.
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl Storage {
    /// Create an in-memory store with no durability.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(StorageInner {
                data_dir: None,
                sessions: Mutex::new(SessionTable::default()),
                attendance: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Open a store rooted at `data_dir`, loading any existing snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`NexusError::PersistenceError`] if existing snapshot files
    /// cannot be read or parsed.
    pub fn open(data_dir: PathBuf) -> Result<Self> {
        let sessions: SessionTable = load_json(&data_dir.join(SESSIONS_FILE))?.unwrap_or_default();
        let attendance: Vec<AttendanceRecord> =
            load_json(&data_dir.join(ATTENDANCE_FILE))?.unwrap_or_default();

        Ok(Self {
            inner: Arc::new(StorageInner {
                data_dir: Some(data_dir),
                sessions: Mutex::new(sessions),
                attendance: Mutex::new(attendance),
            }),
        })
    }

    /// Get the default storage location.
    ///
    /// On Linux servers: `/var/lib/nexus/`
    /// For development: the platform data directory.
    pub fn default_data_dir() -> Result<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            Ok(PathBuf::from("/var/lib/nexus"))
        }
        #[cfg(not(target_os = "linux"))]
        {
            let dirs = directories::ProjectDirs::from("", "", "nexus").ok_or_else(|| {
                NexusError::PersistenceError("Cannot determine data directory".into())
            })?;
            Ok(dirs.data_dir().to_path_buf())
        }
    }

    // =========================================================================
    // SESSIONS
    // =========================================================================

    /// Read a consistent snapshot of all session rows and the commit version.
    #[must_use]
    pub fn sessions_snapshot(&self) -> (Vec<Session>, u64) {
        let table = lock(&self.inner.sessions);
        (table.rows.clone(), table.version)
    }

    /// Commit a full session-table replacement.
    ///
    /// The commit is atomic: it applies entirely or not at all. Within the
    /// commit the one-active-session-per-host constraint is revalidated, so
    /// a write that would leave two active sessions for one host is rejected
    /// outright rather than persisted.
    ///
    /// # Errors
    ///
    /// - [`NexusError::StorageConflict`] if another writer committed since
    ///   `expected_version` was read.
    /// - [`NexusError::ConstraintViolation`] if the rows break the
    ///   one-active-per-host rule.
    /// - [`NexusError::PersistenceError`] if the snapshot cannot be
    ///   written; the in-memory table is rolled back.
    pub fn commit_sessions(&self, rows: Vec<Session>, expected_version: u64) -> Result<()> {
        check_one_active_per_host(&rows)?;

        let mut table = lock(&self.inner.sessions);
        if table.version != expected_version {
            return Err(NexusError::StorageConflict(format!(
                "session table moved from version {expected_version} to {}",
                table.version
            )));
        }

        let previous = std::mem::replace(&mut table.rows, rows);
        table.version += 1;

        if let Some(dir) = &self.inner.data_dir {
            if let Err(e) = save_json(&dir.join(SESSIONS_FILE), &*table) {
                // Roll back so no partial state is visible.
                table.rows = previous;
                table.version -= 1;
                return Err(e);
            }
        }

        Ok(())
    }

    /// True if any session row for `beacon_id` is currently active.
    #[must_use]
    pub fn is_beacon_active(&self, beacon_id: &BeaconId) -> bool {
        lock(&self.inner.sessions)
            .rows
            .iter()
            .any(|s| s.active && s.beacon_id == *beacon_id)
    }

    /// All currently active sessions, optionally filtered by host.
    #[must_use]
    pub fn active_sessions(&self, host_id: Option<&str>) -> Vec<Session> {
        lock(&self.inner.sessions)
            .rows
            .iter()
            .filter(|s| s.active && host_id.map_or(true, |h| s.host_id == h))
            .cloned()
            .collect()
    }

    /// The active session broadcasting `beacon_id`, if any.
    #[must_use]
    pub fn active_session_for_beacon(&self, beacon_id: &BeaconId) -> Option<Session> {
        lock(&self.inner.sessions)
            .rows
            .iter()
            .find(|s| s.active && s.beacon_id == *beacon_id)
            .cloned()
    }

    /// Look up a session row by id.
    #[must_use]
    pub fn session_by_id(&self, session_id: Uuid) -> Option<Session> {
        lock(&self.inner.sessions)
            .rows
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
    }

    // =========================================================================
    // ATTENDANCE
    // =========================================================================

    /// Insert an attendance record unless one already exists for the same
    /// (participant, session) pair.
    ///
    /// Returns the record and whether it was newly created. The existence
    /// check and insert happen under the table lock, so two racing callers
    /// cannot both insert.
    ///
    /// # Errors
    ///
    /// Returns [`NexusError::PersistenceError`] if the snapshot cannot be
    /// written; the in-memory insert is rolled back.
    pub fn create_attendance_if_absent(
        &self,
        record: AttendanceRecord,
    ) -> Result<(AttendanceRecord, bool)> {
        let mut rows = lock(&self.inner.attendance);

        if let Some(existing) = rows
            .iter()
            .find(|r| r.participant_id == record.participant_id && r.session_id == record.session_id)
        {
            return Ok((existing.clone(), false));
        }

        rows.push(record.clone());

        if let Some(dir) = &self.inner.data_dir {
            if let Err(e) = save_json(&dir.join(ATTENDANCE_FILE), &*rows) {
                rows.pop();
                return Err(e);
            }
        }

        Ok((record, true))
    }

    /// Attendance history for one participant, newest first.
    #[must_use]
    pub fn attendance_for_participant(&self, participant_id: &str) -> Vec<AttendanceRecord> {
        let mut records: Vec<AttendanceRecord> = lock(&self.inner.attendance)
            .iter()
            .filter(|r| r.participant_id == participant_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        records
    }

    /// All attendance records, newest first.
    #[must_use]
    pub fn all_attendance(&self) -> Vec<AttendanceRecord> {
        let mut records: Vec<AttendanceRecord> = lock(&self.inner.attendance).clone();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        records
    }
}

/// Reject writes that would leave a host with two active sessions.
fn check_one_active_per_host(rows: &[Session]) -> Result<()> {
    let mut active_hosts: HashSet<&str> = HashSet::new();
    for session in rows.iter().filter(|s| s.active) {
        if !active_hosts.insert(&session.host_id) {
            return Err(NexusError::ConstraintViolation(format!(
                "write would leave host '{}' with multiple active sessions",
                session.host_id
            )));
        }
    }
    Ok(())
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| NexusError::PersistenceError(format!("Failed to read {}: {e}", path.display())))?;
    let value = serde_json::from_str(&content).map_err(|e| {
        NexusError::PersistenceError(format!("Failed to parse {}: {e}", path.display()))
    })?;
    Ok(Some(value))
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            NexusError::PersistenceError(format!(
                "Failed to create directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    let content = serde_json::to_string_pretty(value)
        .map_err(|e| NexusError::PersistenceError(format!("Failed to serialize: {e}")))?;
    std::fs::write(path, content)
        .map_err(|e| NexusError::PersistenceError(format!("Failed to write {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::AttendanceStatus;
    use chrono::Utc;

    fn beacon(raw: &str) -> BeaconId {
        BeaconId::parse(raw).unwrap()
    }

    fn session(host: &str, raw_beacon: &str, active: bool) -> Session {
        Session {
            id: Uuid::new_v4(),
            host_id: host.to_string(),
            beacon_id: beacon(raw_beacon),
            active,
            started_at: Utc::now(),
            stopped_at: None,
        }
    }

    fn record(participant: &str, session_id: Uuid) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            participant_id: participant.to_string(),
            session_id,
            status: AttendanceStatus::Present,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_commit_bumps_version() {
        let storage = Storage::in_memory();
        let (rows, version) = storage.sessions_snapshot();
        assert!(rows.is_empty());
        assert_eq!(version, 0);

        storage
            .commit_sessions(vec![session("host-1", "AABBCCDDEEFF", true)], version)
            .unwrap();

        let (rows, version) = storage.sessions_snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(version, 1);
    }

    #[test]
    fn test_stale_commit_conflicts() {
        let storage = Storage::in_memory();
        let (_, version) = storage.sessions_snapshot();

        storage
            .commit_sessions(vec![session("host-1", "AABBCCDDEEFF", true)], version)
            .unwrap();

        // Second commit against the same (now stale) version loses the race.
        let err = storage
            .commit_sessions(vec![session("host-2", "112233445566", true)], version)
            .unwrap_err();
        assert!(err.is_conflict());

        // The first commit survived untouched.
        let (rows, _) = storage.sessions_snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].host_id, "host-1");
    }

    #[test]
    fn test_commit_rejects_two_active_for_one_host() {
        let storage = Storage::in_memory();
        let (_, version) = storage.sessions_snapshot();

        let rows = vec![
            session("host-1", "AABBCCDDEEFF", true),
            session("host-1", "112233445566", true),
        ];
        let err = storage.commit_sessions(rows, version).unwrap_err();
        assert!(matches!(err, NexusError::ConstraintViolation(_)));
        assert!(!err.is_conflict());

        // Nothing was applied.
        let (rows, version_after) = storage.sessions_snapshot();
        assert!(rows.is_empty());
        assert_eq!(version_after, version);
    }

    #[test]
    fn test_inactive_rows_do_not_count_toward_constraint() {
        let storage = Storage::in_memory();
        let (_, version) = storage.sessions_snapshot();

        let mut old = session("host-1", "AABBCCDDEEFF", false);
        old.stopped_at = Some(Utc::now());
        let rows = vec![old, session("host-1", "112233445566", true)];
        storage.commit_sessions(rows, version).unwrap();
    }

    #[test]
    fn test_is_beacon_active() {
        let storage = Storage::in_memory();
        let (_, version) = storage.sessions_snapshot();
        storage
            .commit_sessions(vec![session("host-1", "AABBCCDDEEFF", true)], version)
            .unwrap();

        assert!(storage.is_beacon_active(&beacon("AABBCCDDEEFF")));
        assert!(!storage.is_beacon_active(&beacon("112233445566")));
    }

    #[test]
    fn test_active_sessions_filter_by_host() {
        let storage = Storage::in_memory();
        let (_, version) = storage.sessions_snapshot();
        storage
            .commit_sessions(
                vec![
                    session("host-1", "AABBCCDDEEFF", true),
                    session("host-2", "112233445566", true),
                ],
                version,
            )
            .unwrap();

        assert_eq!(storage.active_sessions(None).len(), 2);
        assert_eq!(storage.active_sessions(Some("host-1")).len(), 1);
        assert_eq!(storage.active_sessions(Some("host-3")).len(), 0);
    }

    #[test]
    fn test_attendance_create_if_absent_is_idempotent() {
        let storage = Storage::in_memory();
        let session_id = Uuid::new_v4();

        let (first, created) = storage
            .create_attendance_if_absent(record("participant-1", session_id))
            .unwrap();
        assert!(created);

        let (second, created) = storage
            .create_attendance_if_absent(record("participant-1", session_id))
            .unwrap();
        assert!(!created);
        assert_eq!(first.id, second.id);

        assert_eq!(storage.all_attendance().len(), 1);
    }

    #[test]
    fn test_attendance_distinct_pairs_both_insert() {
        let storage = Storage::in_memory();
        let session_a = Uuid::new_v4();
        let session_b = Uuid::new_v4();

        storage
            .create_attendance_if_absent(record("participant-1", session_a))
            .unwrap();
        storage
            .create_attendance_if_absent(record("participant-1", session_b))
            .unwrap();
        storage
            .create_attendance_if_absent(record("participant-2", session_a))
            .unwrap();

        assert_eq!(storage.all_attendance().len(), 3);
        assert_eq!(storage.attendance_for_participant("participant-1").len(), 2);
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();

        {
            let storage = Storage::open(path.clone()).unwrap();
            let (_, version) = storage.sessions_snapshot();
            storage
                .commit_sessions(vec![session("host-1", "AABBCCDDEEFF", true)], version)
                .unwrap();
            storage
                .create_attendance_if_absent(record("participant-1", Uuid::new_v4()))
                .unwrap();
        }

        let reopened = Storage::open(path).unwrap();
        let (rows, version) = reopened.sessions_snapshot();
        assert_eq!(rows.len(), 1);
        assert_eq!(version, 1);
        assert!(reopened.is_beacon_active(&beacon("AABBCCDDEEFF")));
        assert_eq!(reopened.all_attendance().len(), 1);
    }

    #[test]
    fn test_failed_session_persist_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path().to_path_buf()).unwrap();
        let (_, version) = storage.sessions_snapshot();
        storage
            .commit_sessions(vec![session("host-1", "AABBCCDDEEFF", true)], version)
            .unwrap();

        // Occupy the snapshot path with a directory so the next write fails.
        let snapshot_path = dir.path().join(SESSIONS_FILE);
        std::fs::remove_file(&snapshot_path).unwrap();
        std::fs::create_dir(&snapshot_path).unwrap();

        let (rows_before, version_before) = storage.sessions_snapshot();
        let err = storage
            .commit_sessions(vec![session("host-2", "112233445566", true)], version_before)
            .unwrap_err();
        assert!(err.is_io_error());

        // The failed commit left no trace: same version, same rows.
        let (rows_after, version_after) = storage.sessions_snapshot();
        assert_eq!(version_after, version_before);
        assert_eq!(rows_after, rows_before);
        assert!(storage.is_beacon_active(&beacon("AABBCCDDEEFF")));
        assert!(!storage.is_beacon_active(&beacon("112233445566")));
    }

    #[test]
    fn test_failed_attendance_persist_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path().to_path_buf()).unwrap();
        std::fs::create_dir(dir.path().join(ATTENDANCE_FILE)).unwrap();

        let err = storage
            .create_attendance_if_absent(record("participant-1", Uuid::new_v4()))
            .unwrap_err();
        assert!(err.is_io_error());

        // The failed insert was rolled back, so a later retry against a
        // writable path creates the record fresh.
        assert!(storage.all_attendance().is_empty());
        std::fs::remove_dir(dir.path().join(ATTENDANCE_FILE)).unwrap();
        let (_, created) = storage
            .create_attendance_if_absent(record("participant-1", Uuid::new_v4()))
            .unwrap();
        assert!(created);
        assert_eq!(storage.all_attendance().len(), 1);
    }

    #[test]
    fn test_open_rejects_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSIONS_FILE), "not json").unwrap();

        let err = Storage::open(dir.path().to_path_buf()).unwrap_err();
        assert!(err.is_io_error());
    }

    #[test]
    fn test_clones_share_tables() {
        let storage = Storage::in_memory();
        let clone = storage.clone();

        let (_, version) = storage.sessions_snapshot();
        storage
            .commit_sessions(vec![session("host-1", "AABBCCDDEEFF", true)], version)
            .unwrap();

        assert!(clone.is_beacon_active(&beacon("AABBCCDDEEFF")));
    }
}
