//! Session engine implementation.
//!
//! The session engine is a clock-driven state machine. It does not use
//! internal tasks - the caller passes the current instant to every command
//! and feeds it one reading per tick.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Active -> Stopped -> Active -> ...
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new();
//! engine.start(Instant::now());
//! // On every tick:
//! engine.record_sample(reading, bounds, Instant::now());
//! let summary = engine.stop();
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::events::Event;
use crate::zone::ZoneBounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    Active,
    Stopped,
}

/// Where a reading falls relative to the target band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Below,
    In,
    Above,
}

impl Classification {
    /// Both bounds belong to `In`.
    pub fn classify(reading: u32, bounds: ZoneBounds) -> Self {
        if reading < bounds.lower {
            Classification::Below
        } else if reading > bounds.upper {
            Classification::Above
        } else {
            Classification::In
        }
    }

    /// Instruction shown on the wearable.
    pub fn message(self) -> &'static str {
        match self {
            Classification::Below => "FASTER",
            Classification::In => "THAT'S IT!",
            Classification::Above => "SLOWER",
        }
    }
}

/// Live state of the current (or last) session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub current_reading: Option<u32>,
    pub classification: Option<Classification>,
    pub in_zone_elapsed: Duration,
    pub out_of_zone_elapsed: Duration,
    /// Set when the session stops.
    pub total_elapsed: Duration,
    pub running: bool,
    pub message: String,
}

/// Frozen result of a stopped session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub in_zone: Duration,
    pub out_of_zone: Duration,
    pub total: Duration,
    /// `None` for a session with no accumulated time.
    pub in_zone_ratio: Option<f64>,
}

impl SessionSummary {
    pub fn new(
        started_at: DateTime<Utc>,
        stopped_at: DateTime<Utc>,
        in_zone: Duration,
        out_of_zone: Duration,
    ) -> Self {
        let total = in_zone + out_of_zone;
        let in_zone_ratio = if total.is_zero() {
            None
        } else {
            Some(in_zone.as_secs_f64() / total.as_secs_f64())
        };
        Self {
            started_at,
            stopped_at,
            in_zone,
            out_of_zone,
            total,
            in_zone_ratio,
        }
    }
}

/// Result of one successful tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub reading: u32,
    pub classification: Classification,
    pub bounds: ZoneBounds,
    pub elapsed: Duration,
}

impl TickOutcome {
    pub fn to_event(&self) -> Event {
        Event::TickRecorded {
            reading: self.reading,
            classification: self.classification,
            bounds: self.bounds,
            elapsed_ms: self.elapsed.as_millis() as u64,
            message: self.classification.message().to_string(),
            at: Utc::now(),
        }
    }
}

/// Core session state machine.
#[derive(Debug, Clone)]
pub struct SessionEngine {
    phase: SessionPhase,
    state: SessionState,
    /// Instant of the last successful tick (or of the start).
    anchor: Option<Instant>,
    started_at: Option<DateTime<Utc>>,
    summary: Option<SessionSummary>,
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEngine {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            state: SessionState::default(),
            anchor: None,
            started_at: None,
            summary: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn anchor(&self) -> Option<Instant> {
        self.anchor
    }

    /// Summary of the last stopped session, until the next start.
    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            reading: self.state.current_reading,
            classification: self.state.classification,
            in_zone_ms: self.state.in_zone_elapsed.as_millis() as u64,
            out_of_zone_ms: self.state.out_of_zone_elapsed.as_millis() as u64,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a fresh session. No-op while already active.
    pub fn start(&mut self, now: Instant) -> Option<Event> {
        match self.phase {
            SessionPhase::Idle | SessionPhase::Stopped => {
                let at = Utc::now();
                self.phase = SessionPhase::Active;
                self.state = SessionState {
                    running: true,
                    ..SessionState::default()
                };
                self.anchor = Some(now);
                self.started_at = Some(at);
                self.summary = None;
                Some(Event::SessionStarted { at })
            }
            SessionPhase::Active => None,
        }
    }

    /// Classify `reading` and charge the time since the last tick to its
    /// classification. Ignored unless active.
    pub fn record_sample(&mut self, reading: u32, bounds: ZoneBounds, now: Instant) -> Option<TickOutcome> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        let anchor = self.anchor?;
        let elapsed = now.saturating_duration_since(anchor);
        let classification = Classification::classify(reading, bounds);

        match classification {
            Classification::In => self.state.in_zone_elapsed += elapsed,
            Classification::Below | Classification::Above => self.state.out_of_zone_elapsed += elapsed,
        }
        self.anchor = Some(now);
        self.state.current_reading = Some(reading);
        self.state.classification = Some(classification);
        self.state.message = classification.message().to_string();

        Some(TickOutcome {
            reading,
            classification,
            bounds,
            elapsed,
        })
    }

    /// A tick without a reading. Accumulators and anchor stay put.
    pub fn record_unavailable(&mut self, reason: &str) -> Option<Event> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        Some(Event::TickSkipped {
            reason: reason.to_string(),
            at: Utc::now(),
        })
    }

    /// Finish the session and freeze its totals.
    pub fn stop(&mut self) -> Option<SessionSummary> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        let stopped_at = Utc::now();
        self.phase = SessionPhase::Stopped;
        self.anchor = None;
        self.state.running = false;
        self.state.total_elapsed = self.state.in_zone_elapsed + self.state.out_of_zone_elapsed;

        let summary = SessionSummary::new(
            self.started_at.unwrap_or(stopped_at),
            stopped_at,
            self.state.in_zone_elapsed,
            self.state.out_of_zone_elapsed,
        );
        self.summary = Some(summary.clone());
        Some(summary)
    }
}
