//! Wire envelopes exchanged between the phone and the wearable.
//!
//! An encoded envelope is a JSON object with an `origin` (the sender's
//! device id) and exactly one payload key:
//!
//! ```text
//! { "origin": "zonekeeper-…", "settings": { … } }
//! { "origin": "zonekeeper-…", "workoutIsStarted": true }
//! { "origin": "zonekeeper-…", "hapticDemo": { "running": true, "pattern": "retry" } }
//! { "origin": "zonekeeper-…", "lower": 123, "upper": 132 }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::settings::{HapticPattern, SettingsDocument};

pub const ORIGIN_KEY: &str = "origin";
pub const SETTINGS_KEY: &str = "settings";
pub const SESSION_KEY: &str = "workoutIsStarted";
pub const HAPTIC_DEMO_KEY: &str = "hapticDemo";
pub const LEGACY_LOWER_KEY: &str = "lower";
pub const LEGACY_UPPER_KEY: &str = "upper";

/// Preview request for the alert patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HapticDemoRequest {
    pub running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<HapticPattern>,
}

/// Decoded payload of one envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEnvelope {
    /// Full (or partial) settings snapshot.
    Settings(SettingsDocument),
    /// Remote session start (`true`) or stop (`false`).
    SessionSignal(bool),
    HapticDemo(HapticDemoRequest),
    /// Boundary push from peers that predate the settings document.
    LegacyBounds { lower: u32, upper: u32 },
}

/// Envelope bytes plus the sender they claim to come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEnvelope {
    pub origin: String,
    pub bytes: Vec<u8>,
}

/// Result of decoding: the payload and, if present, its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEnvelope {
    pub origin: Option<String>,
    pub envelope: SyncEnvelope,
}

impl SyncEnvelope {
    /// Wire key naming this payload.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncEnvelope::Settings(_) => SETTINGS_KEY,
            SyncEnvelope::SessionSignal(_) => SESSION_KEY,
            SyncEnvelope::HapticDemo(_) => HAPTIC_DEMO_KEY,
            SyncEnvelope::LegacyBounds { .. } => LEGACY_LOWER_KEY,
        }
    }

    pub fn encode(&self, origin: &str) -> Result<EncodedEnvelope, serde_json::Error> {
        let mut map = Map::new();
        map.insert(ORIGIN_KEY.into(), Value::String(origin.to_string()));
        match self {
            SyncEnvelope::Settings(doc) => {
                map.insert(SETTINGS_KEY.into(), serde_json::to_value(doc)?);
            }
            SyncEnvelope::SessionSignal(started) => {
                map.insert(SESSION_KEY.into(), Value::Bool(*started));
            }
            SyncEnvelope::HapticDemo(request) => {
                map.insert(HAPTIC_DEMO_KEY.into(), serde_json::to_value(request)?);
            }
            SyncEnvelope::LegacyBounds { lower, upper } => {
                map.insert(LEGACY_LOWER_KEY.into(), Value::from(*lower));
                map.insert(LEGACY_UPPER_KEY.into(), Value::from(*upper));
            }
        }
        Ok(EncodedEnvelope {
            origin: origin.to_string(),
            bytes: serde_json::to_vec(&Value::Object(map))?,
        })
    }

    /// Decode an envelope. Unknown keys are ignored; exactly one known
    /// payload must be present.
    pub fn decode(bytes: &[u8]) -> Result<DecodedEnvelope, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let Value::Object(mut map) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let origin = match map.remove(ORIGIN_KEY) {
            Some(Value::String(origin)) => Some(origin),
            Some(_) => return Err(invalid(ORIGIN_KEY, "expected a string")),
            None => None,
        };

        let mut present: Vec<String> = [SETTINGS_KEY, SESSION_KEY, HAPTIC_DEMO_KEY]
            .into_iter()
            .filter(|key| map.contains_key(*key))
            .map(str::to_string)
            .collect();
        if map.contains_key(LEGACY_LOWER_KEY) || map.contains_key(LEGACY_UPPER_KEY) {
            present.push(LEGACY_LOWER_KEY.to_string());
        }
        match present.len() {
            0 => return Err(DecodeError::MissingPayload),
            1 => {}
            _ => return Err(DecodeError::AmbiguousPayload(present)),
        }

        let envelope = match present[0].as_str() {
            SETTINGS_KEY => {
                let payload = map.remove(SETTINGS_KEY).unwrap_or(Value::Null);
                if !payload.is_object() {
                    return Err(invalid(SETTINGS_KEY, "expected an object"));
                }
                SyncEnvelope::Settings(
                    serde_json::from_value(payload).map_err(|e| invalid(SETTINGS_KEY, &e.to_string()))?,
                )
            }
            SESSION_KEY => match map.remove(SESSION_KEY) {
                Some(Value::Bool(started)) => SyncEnvelope::SessionSignal(started),
                _ => return Err(invalid(SESSION_KEY, "expected a boolean")),
            },
            HAPTIC_DEMO_KEY => {
                let payload = map.remove(HAPTIC_DEMO_KEY).unwrap_or(Value::Null);
                SyncEnvelope::HapticDemo(
                    serde_json::from_value(payload).map_err(|e| invalid(HAPTIC_DEMO_KEY, &e.to_string()))?,
                )
            }
            _ => SyncEnvelope::LegacyBounds {
                lower: bound(&map, LEGACY_LOWER_KEY)?,
                upper: bound(&map, LEGACY_UPPER_KEY)?,
            },
        };

        Ok(DecodedEnvelope { origin, envelope })
    }
}

fn bound(map: &Map<String, Value>, key: &str) -> Result<u32, DecodeError> {
    map.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| invalid(key, "expected a non-negative integer"))
}

fn invalid(key: &str, message: &str) -> DecodeError {
    DecodeError::InvalidPayload {
        key: key.to_string(),
        message: message.to_string(),
    }
}
