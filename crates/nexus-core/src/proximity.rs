//! Proximity validation against an active broadcast session.
//!
//! Combines the beacon normalizers with the session registry to decide
//! whether a participant's observed reading proves co-presence with a
//! host's broadcast. Every failure branch fails closed: malformed input or
//! a missing session yields INVALID with a reason code, never an error and
//! never VALID.

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::beacon::{rssi_from_json, BeaconId};
use crate::session::SessionRegistry;

/// Why a validation resolved to INVALID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    /// The host beacon identifier could not be normalized.
    InvalidHostBeacon,
    /// The participant beacon identifier could not be normalized.
    InvalidParticipantBeacon,
    /// The participant signal reading was not numeric.
    InvalidSignal,
    /// No session is currently broadcasting the host beacon.
    NoActiveSession,
    /// The reading was weaker than the configured threshold.
    BelowThreshold,
}

/// Outcome of a proximity validation. Always definite, never "unknown".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The participant's reading proves co-presence.
    Valid {
        /// The normalized participant signal that passed the threshold.
        signal: i16,
    },
    /// Validation failed; `reason` says where it fell over.
    Invalid {
        /// Diagnostic reason code.
        reason: InvalidReason,
    },
}

impl ValidationOutcome {
    /// True for the VALID outcome.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    /// The reason code, when INVALID.
    #[must_use]
    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid { reason } => Some(*reason),
        }
    }
}

/// Validates participant proximity against the host's active session.
#[derive(Debug, Clone)]
pub struct ProximityValidator {
    registry: SessionRegistry,
    threshold: i16,
}

impl ProximityValidator {
    /// Create a validator with the given RSSI threshold (dBm).
    ///
    /// Readings at or above the threshold are considered near enough.
    /// RSSI is negative dBm, so "at or above" means numerically closer to
    /// zero: with the default threshold of -65, a reading of -60 passes and
    /// -70 does not.
    #[must_use]
    pub fn new(registry: SessionRegistry, threshold: i16) -> Self {
        Self {
            registry,
            threshold,
        }
    }

    /// The configured threshold in dBm.
    #[must_use]
    pub fn threshold(&self) -> i16 {
        self.threshold
    }

    /// Decide VALID/INVALID for one observed reading.
    ///
    /// Steps, failing closed at each:
    /// 1. normalize the host beacon (its signal is irrelevant)
    /// 2. normalize the participant beacon and signal
    /// 3. check the registry for an active session on the host beacon
    /// 4. compare `signal >= threshold`
    #[must_use]
    pub fn validate(
        &self,
        host_beacon_raw: &str,
        participant_beacon_raw: &str,
        participant_signal_raw: &serde_json::Value,
    ) -> ValidationOutcome {
        let Ok(host_beacon) = BeaconId::parse(host_beacon_raw) else {
            return ValidationOutcome::Invalid {
                reason: InvalidReason::InvalidHostBeacon,
            };
        };

        let Ok(_participant_beacon) = BeaconId::parse(participant_beacon_raw) else {
            return ValidationOutcome::Invalid {
                reason: InvalidReason::InvalidParticipantBeacon,
            };
        };

        let Ok(signal) = rssi_from_json(participant_signal_raw) else {
            return ValidationOutcome::Invalid {
                reason: InvalidReason::InvalidSignal,
            };
        };

        if !self.registry.is_active(&host_beacon) {
            return ValidationOutcome::Invalid {
                reason: InvalidReason::NoActiveSession,
            };
        }

        if signal >= self.threshold {
            debug!(beacon_id = %host_beacon, signal, threshold = self.threshold, "proximity valid");
            ValidationOutcome::Valid { signal }
        } else {
            debug!(beacon_id = %host_beacon, signal, threshold = self.threshold, "below threshold");
            ValidationOutcome::Invalid {
                reason: InvalidReason::BelowThreshold,
            }
        }
    }
}
