//! # nexus-core
//!
//! Core business logic for the nexus beacon-proximity attendance system.
//!
//! This crate provides:
//! - Beacon identifier and signal-strength normalization
//! - Broadcast session lifecycle management (one active session per host)
//! - Proximity validation against an active session
//! - Idempotent attendance recording
//! - Configuration management and persistent storage
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`beacon`] - Beacon identifier cleaning and RSSI normalization
//! - [`session`] - Session registry state machine (start/stop/activity queries)
//! - [`proximity`] - Proximity validation combining normalizers and registry
//! - [`attendance`] - Idempotent attendance record creation and history
//! - [`identity`] - Collaborator seams for identity lookup and notification
//! - [`store`] - Persistent storage for sessions and attendance records
//! - [`config`] - Application configuration loading, saving, and validation
//! - [`error`] - Unified error types for the crate

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod attendance;
pub mod beacon;
pub mod config;
pub mod error;
pub mod identity;
pub mod proximity;
pub mod session;
pub mod store;

// Re-export primary types for convenience
pub use attendance::{AttendanceRecord, AttendanceRecorder, AttendanceStatus};
pub use beacon::{clamp_rssi, parse_rssi, rssi_from_json, BeaconId, RSSI_CEILING, RSSI_FLOOR};
pub use config::{LogConfig, NexusConfig, ServerConfig, DEFAULT_RSSI_THRESHOLD};
pub use error::{NexusError, Result};
pub use identity::{
    Actor, ActorRole, IdentityStore, LogNotifier, NotificationEvent, Notifier, StaticIdentityStore,
};
pub use proximity::{InvalidReason, ProximityValidator, ValidationOutcome};
pub use session::{Session, SessionRegistry};
pub use store::Storage;
