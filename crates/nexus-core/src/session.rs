//! Broadcast session lifecycle management.
//!
//! Each host broadcasts at most one beacon at a time. Starting a session
//! deactivates whatever the host had active and activates the requested
//! (host, beacon) pair in one atomic commit, so no interleaving of
//! concurrent starts can leave a host with two active sessions.
//!
//! A (host, beacon) pair maps to a single session row for its lifetime:
//! restarting the same pair reactivates the existing row rather than
//! creating a duplicate, and rows are never deleted - deactivation is the
//! terminal state of an activation cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::beacon::BeaconId;
use crate::error::{NexusError, Result};
use crate::store::Storage;

/// A broadcast session owned by one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Session {
    /// Stable session id.
    pub id: Uuid,

    /// The host that owns this session.
    #[schema(example = "host-42")]
    pub host_id: String,

    /// Canonical beacon identifier being broadcast.
    pub beacon_id: BeaconId,

    /// Whether this session is currently broadcasting.
    pub active: bool,

    /// When the current (or last) activation cycle began (UTC).
    pub started_at: DateTime<Utc>,

    /// When the session was last deactivated (UTC). `None` while active.
    pub stopped_at: Option<DateTime<Utc>>,
}

/// State machine enforcing "one active session per host".
///
/// All mutation goes through snapshot + versioned commit against the
/// injected [`Storage`]; a commit that loses a race is retried against a
/// fresh snapshot up to `max_commit_retries` times before the conflict is
/// surfaced to the caller.
#[derive(Debug, Clone)]
pub struct SessionRegistry {
    storage: Storage,
    max_commit_retries: u32,
}

impl SessionRegistry {
    /// Create a registry over the given storage handle.
    #[must_use]
    pub fn new(storage: Storage, max_commit_retries: u32) -> Self {
        Self {
            storage,
            max_commit_retries: max_commit_retries.max(1),
        }
    }

    /// Start (or restart) the session for `(host_id, beacon_id)`.
    ///
    /// Within one commit: every active session owned by `host_id` is
    /// deactivated with `stopped_at = now`, then the (host, beacon) row is
    /// found or created and activated with a fresh `started_at`. The last
    /// committed start wins; concurrent starts for the same host can never
    /// both leave a session active.
    ///
    /// # Errors
    ///
    /// - [`NexusError::StorageConflict`] after retry exhaustion.
    /// - [`NexusError::PersistenceError`] if the commit cannot be persisted;
    ///   no partial state change is visible.
    pub fn start(&self, host_id: &str, beacon_id: &BeaconId) -> Result<Session> {
        self.with_retries("start", |storage| {
            let (mut rows, version) = storage.sessions_snapshot();
            let now = Utc::now();

            for row in rows.iter_mut().filter(|s| s.active && s.host_id == host_id) {
                row.active = false;
                row.stopped_at = Some(now);
            }

            let session = match rows
                .iter_mut()
                .find(|s| s.host_id == host_id && s.beacon_id == *beacon_id)
            {
                Some(existing) => {
                    existing.active = true;
                    existing.started_at = now;
                    existing.stopped_at = None;
                    existing.clone()
                }
                None => {
                    let created = Session {
                        id: Uuid::new_v4(),
                        host_id: host_id.to_string(),
                        beacon_id: beacon_id.clone(),
                        active: true,
                        started_at: now,
                        stopped_at: None,
                    };
                    rows.push(created.clone());
                    created
                }
            };

            storage.commit_sessions(rows, version)?;
            debug!(host_id, beacon_id = %session.beacon_id, "session started");
            Ok(session)
        })
    }

    /// Stop the host's active session.
    ///
    /// With a `beacon_id`, only that specific (host, beacon) session is
    /// stopped; without one, whichever session the host currently has active.
    ///
    /// # Errors
    ///
    /// - [`NexusError::SessionNotFound`] if no matching session is active.
    /// - [`NexusError::StorageConflict`] after retry exhaustion.
    pub fn stop(&self, host_id: &str, beacon_id: Option<&BeaconId>) -> Result<Session> {
        self.with_retries("stop", |storage| {
            let (mut rows, version) = storage.sessions_snapshot();
            let now = Utc::now();

            let row = rows
                .iter_mut()
                .find(|s| {
                    s.active
                        && s.host_id == host_id
                        && beacon_id.map_or(true, |b| s.beacon_id == *b)
                })
                .ok_or_else(|| NexusError::SessionNotFound(host_id.to_string()))?;

            row.active = false;
            row.stopped_at = Some(now);
            let stopped = row.clone();

            storage.commit_sessions(rows, version)?;
            debug!(host_id, beacon_id = %stopped.beacon_id, "session stopped");
            Ok(stopped)
        })
    }

    /// True if any session anywhere is currently broadcasting `beacon_id`.
    #[must_use]
    pub fn is_active(&self, beacon_id: &BeaconId) -> bool {
        self.storage.is_beacon_active(beacon_id)
    }

    /// Currently active sessions, optionally filtered by host.
    #[must_use]
    pub fn list_active(&self, host_id: Option<&str>) -> Vec<Session> {
        self.storage.active_sessions(host_id)
    }

    /// The active session broadcasting `beacon_id`, if any.
    #[must_use]
    pub fn active_session_for_beacon(&self, beacon_id: &BeaconId) -> Option<Session> {
        self.storage.active_session_for_beacon(beacon_id)
    }

    /// Look up a session row by id, active or not.
    #[must_use]
    pub fn find_session(&self, session_id: Uuid) -> Option<Session> {
        self.storage.session_by_id(session_id)
    }

    /// Run a snapshot-mutate-commit closure, retrying on commit conflicts.
    fn with_retries<T>(
        &self,
        operation: &str,
        mut attempt: impl FnMut(&Storage) -> Result<T>,
    ) -> Result<T> {
        let mut last_conflict = None;
        for try_number in 1..=self.max_commit_retries {
            match attempt(&self.storage) {
                Err(err) if err.is_conflict() => {
                    warn!(
                        operation,
                        try_number,
                        max = self.max_commit_retries,
                        "commit conflict, retrying against fresh snapshot"
                    );
                    last_conflict = Some(err);
                }
                other => return other,
            }
        }
        // max_commit_retries >= 1, so at least one attempt ran and stored
        // the conflict it lost.
        Err(last_conflict
            .unwrap_or_else(|| NexusError::StorageConflict("retries exhausted".to_string())))
    }
}
