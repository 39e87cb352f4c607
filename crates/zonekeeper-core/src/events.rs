use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{Classification, SessionPhase, SessionSummary};
use crate::settings::HapticPattern;
use crate::zone::ZoneBounds;

/// Every state change in the system produces an Event.
/// Observers subscribe to them; the CLI prints them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        at: DateTime<Utc>,
    },
    /// A reading was classified and its elapsed time accumulated.
    TickRecorded {
        reading: u32,
        classification: Classification,
        bounds: ZoneBounds,
        elapsed_ms: u64,
        message: String,
        at: DateTime<Utc>,
    },
    /// No reading this tick; the anchor was left in place.
    TickSkipped {
        reason: String,
        at: DateTime<Utc>,
    },
    SessionStopped {
        summary: SessionSummary,
    },
    /// The settings document changed through a merge with a peer copy.
    SettingsMerged {
        echoed: bool,
        at: DateTime<Utc>,
    },
    /// A haptic preview was requested by the peer.
    HapticDemo {
        running: bool,
        pattern: Option<HapticPattern>,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: SessionPhase,
        reading: Option<u32>,
        classification: Option<Classification>,
        in_zone_ms: u64,
        out_of_zone_ms: u64,
        at: DateTime<Utc>,
    },
}
