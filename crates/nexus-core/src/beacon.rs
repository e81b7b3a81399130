//! Beacon identifier cleaning and RSSI normalization.
//!
//! Raw readings arrive from phone clients in whatever shape the platform
//! Bluetooth stack hands out: identifiers with colon/dash separators and
//! mixed case, signal strengths as strings or floats. Everything is
//! canonicalized here before it touches the registry or storage.
//!
//! Both normalizers are pure functions with no side effects.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{NexusError, Result};

/// Canonical beacon identifiers after cleaning: 8-12 uppercase hex chars.
static BEACON_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-F]{8,12}$").expect("beacon id regex is valid"));

/// Strongest plausible reading. Positive raw values clamp here.
pub const RSSI_CEILING: i16 = -30;

/// Realistic noise floor. Anything weaker clamps here.
pub const RSSI_FLOOR: i16 = -120;

/// A canonical beacon identifier.
///
/// Always 8-12 uppercase hexadecimal characters with no separators.
/// Can only be produced via [`BeaconId::parse`]; raw identifiers are never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(example = "AABBCCDDEEFF")]
pub struct BeaconId(String);

impl BeaconId {
    /// Parse a raw identifier into canonical form.
    ///
    /// Strips all non-hexadecimal characters (separators, whitespace) and
    /// uppercases the remainder, so `"aa:bb:cc:dd:ee:ff"` and
    /// `"AA-BB-CC-DD-EE-FF"` both canonicalize to `"AABBCCDDEEFF"`.
    ///
    /// # Errors
    ///
    /// Returns [`NexusError::InvalidIdentifier`] when the input is empty or
    /// the cleaned result is not 8-12 hex characters.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(NexusError::InvalidIdentifier(
                "identifier is empty".to_string(),
            ));
        }

        let cleaned: String = trimmed
            .chars()
            .filter(char::is_ascii_hexdigit)
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if !BEACON_ID_RE.is_match(&cleaned) {
            return Err(NexusError::InvalidIdentifier(format!(
                "'{cleaned}' is not 8-12 hex characters after cleaning"
            )));
        }

        Ok(Self(cleaned))
    }

    /// The canonical identifier string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BeaconId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Clamp a numeric RSSI reading into the plausible [-120, -30] range.
///
/// A positive reading is physically implausible for this measurement and is
/// treated as "as strong as possible".
#[must_use]
pub fn clamp_rssi(value: i64) -> i16 {
    if value > 0 {
        RSSI_CEILING
    } else if value < i64::from(RSSI_FLOOR) {
        RSSI_FLOOR
    } else {
        // Range check above guarantees the cast fits.
        value as i16
    }
}

/// Parse a raw signal reading string and clamp it into range.
///
/// Accepts integer or float text (floats truncate toward zero, matching the
/// readings some clients report).
///
/// # Errors
///
/// Returns [`NexusError::InvalidSignal`] when the input is not numeric or is
/// NaN/infinite.
pub fn parse_rssi(raw: &str) -> Result<i16> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NexusError::InvalidSignal("signal is empty".to_string()));
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| NexusError::InvalidSignal(format!("'{trimmed}' is not numeric")))?;

    if !value.is_finite() {
        return Err(NexusError::InvalidSignal(format!(
            "'{trimmed}' is not a finite number"
        )));
    }

    Ok(clamp_rssi(value.trunc() as i64))
}

/// Normalize a signal reading arriving as loose JSON (number or string).
///
/// This is the shape readings take at the HTTP boundary, where clients send
/// whatever their Bluetooth stack produced.
///
/// # Errors
///
/// Returns [`NexusError::InvalidSignal`] for null, booleans, objects, arrays,
/// or non-numeric strings.
pub fn rssi_from_json(value: &serde_json::Value) -> Result<i16> {
    match value {
        serde_json::Value::Number(n) => {
            let f = n
                .as_f64()
                .ok_or_else(|| NexusError::InvalidSignal(format!("'{n}' is out of range")))?;
            if !f.is_finite() {
                return Err(NexusError::InvalidSignal(format!(
                    "'{n}' is not a finite number"
                )));
            }
            Ok(clamp_rssi(f.trunc() as i64))
        }
        serde_json::Value::String(s) => parse_rssi(s),
        other => Err(NexusError::InvalidSignal(format!(
            "expected a number or numeric string, got {other}"
        ))),
    }
}
