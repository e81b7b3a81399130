//! Collaborator seams: identity lookup and notification delivery.
//!
//! The core does not own identity data. Registration, role management, and
//! bulk import live in an external identity system; the core only asks
//! whether an actor exists before accepting an operation that references
//! it. Likewise, notification delivery is external and strictly
//! fire-and-forget - a failing notifier must never fail a core operation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;
use utoipa::ToSchema;

/// Role an actor plays in the attendance flow.
///
/// One tagged type with an explicit role, resolved once at this boundary;
/// there are no parallel per-role lookup tables inside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Opens sessions and broadcasts a beacon.
    Host,
    /// Has their proximity to a host's beacon validated.
    Participant,
    /// Administrative actor; not used by core operations.
    Admin,
}

/// An actor known to the identity system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Actor {
    /// Identity-system id.
    #[schema(example = "host-42")]
    pub id: String,

    /// The actor's role.
    pub role: ActorRole,
}

/// Read-only view of the external identity system.
pub trait IdentityStore: Send + Sync {
    /// True if `id` is a known host.
    fn exists_host(&self, id: &str) -> bool;

    /// True if `id` is a known participant.
    fn exists_participant(&self, id: &str) -> bool;
}

/// In-memory identity store, used for deployment bootstrap and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityStore {
    actors: HashMap<String, Actor>,
}

impl StaticIdentityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an actor.
    pub fn insert(&mut self, id: &str, role: ActorRole) {
        self.actors.insert(
            id.to_string(),
            Actor {
                id: id.to_string(),
                role,
            },
        );
    }

    /// Look up an actor by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Actor> {
        self.actors.get(id)
    }
}

impl IdentityStore for StaticIdentityStore {
    fn exists_host(&self, id: &str) -> bool {
        self.actors
            .get(id)
            .map_or(false, |a| a.role == ActorRole::Host)
    }

    fn exists_participant(&self, id: &str) -> bool {
        self.actors
            .get(id)
            .map_or(false, |a| a.role == ActorRole::Participant)
    }
}

/// An event worth telling the outside world about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    /// Attendance was recorded for a participant.
    AttendanceMarked {
        /// The participant whose attendance was recorded.
        participant_id: String,
        /// The session they were validated against.
        session_id: uuid::Uuid,
    },
}

/// Fire-and-forget notification delivery.
///
/// Implementations must swallow their own failures; `notify` is infallible
/// by contract so a broken mail relay can never block attendance.
pub trait Notifier: Send + Sync {
    /// Deliver (or drop) a notification.
    fn notify(&self, event: &NotificationEvent);
}

/// Notifier that only writes to the log.
///
/// The default wiring until a real delivery channel is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &NotificationEvent) {
        match event {
            NotificationEvent::AttendanceMarked {
                participant_id,
                session_id,
            } => {
                debug!(participant_id, %session_id, "attendance notification");
            }
        }
    }
}
