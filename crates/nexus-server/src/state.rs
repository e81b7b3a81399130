//! Application state shared across handlers.

use std::path::Path;
use std::sync::Arc;

use nexus_core::{
    AttendanceRecorder, IdentityStore, LogNotifier, NexusConfig, Notifier, ProximityValidator,
    SessionRegistry, StaticIdentityStore, Storage,
};
use tokio::sync::RwLock;
use tracing::info;

/// Shared application state handed to every handler.
pub type SharedState = Arc<RwLock<AppState>>;

/// Application state: configuration plus the core components, all sharing
/// one storage handle.
pub struct AppState {
    /// Loaded configuration.
    pub config: NexusConfig,
    /// Session lifecycle state machine.
    pub registry: SessionRegistry,
    /// Proximity decision logic.
    pub validator: ProximityValidator,
    /// Idempotent attendance persistence.
    pub recorder: AttendanceRecorder,
    /// External identity lookup.
    pub identity: Arc<dyn IdentityStore>,
    /// Fire-and-forget notification delivery.
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Build application state from configuration.
    ///
    /// Storage is opened at the configured data directory, or kept
    /// in-memory when none is set. Known actors are loaded from
    /// `actors.json` in the data directory when present.
    pub fn from_config(config: NexusConfig) -> anyhow::Result<Self> {
        let storage = match &config.data_dir {
            Some(dir) => Storage::open(dir.clone())?,
            None => Storage::in_memory(),
        };

        let identity = match &config.data_dir {
            Some(dir) => load_identity(dir)?,
            None => StaticIdentityStore::new(),
        };

        Ok(Self::assemble(config, storage, Arc::new(identity), Arc::new(LogNotifier)))
    }

    /// Build application state from explicit parts.
    ///
    /// Used by tests to inject an in-memory store and a canned identity set.
    #[must_use]
    pub fn assemble(
        config: NexusConfig,
        storage: Storage,
        identity: Arc<dyn IdentityStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let registry = SessionRegistry::new(storage.clone(), config.max_commit_retries);
        let validator = ProximityValidator::new(registry.clone(), config.rssi_threshold);
        let recorder = AttendanceRecorder::new(storage);

        Self {
            config,
            registry,
            validator,
            recorder,
            identity,
            notifier,
        }
    }

    /// Wrap into the shared handle handlers expect.
    #[must_use]
    pub fn into_shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }
}

/// Load the bootstrap actor set from `<data_dir>/actors.json`.
///
/// The file is a plain JSON array of `{id, role}` objects. A missing file
/// yields an empty store; identity then has to be provisioned before any
/// session or attendance call succeeds.
fn load_identity(data_dir: &Path) -> anyhow::Result<StaticIdentityStore> {
    let path = data_dir.join("actors.json");
    let mut store = StaticIdentityStore::new();

    if !path.exists() {
        info!(path = %path.display(), "no actors file, identity store starts empty");
        return Ok(store);
    }

    let content = std::fs::read_to_string(&path)?;
    let actors: Vec<nexus_core::Actor> = serde_json::from_str(&content)?;
    let count = actors.len();
    for actor in actors {
        store.insert(&actor.id, actor.role);
    }
    info!(count, path = %path.display(), "loaded actors");
    Ok(store)
}
