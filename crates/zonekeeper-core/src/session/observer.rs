//! Session observers.
//!
//! The controller and the peer link report lifecycle events and finished
//! sessions through [`SessionObserver`]. Implementations here log them,
//! store finished sessions in the local database, or keep them in memory.

use std::sync::Mutex;

use crate::events::Event;
use crate::storage::Database;

use super::engine::SessionSummary;

/// Receives everything a session does. Hooks default to no-ops, so an
/// observer only implements what it cares about.
pub trait SessionObserver: Send + Sync {
    /// Every event emitted by the controller, in order.
    fn on_event(&self, _event: &Event) {}

    /// Called once per stopped session with its frozen totals.
    fn on_session_complete(&self, _summary: &SessionSummary) {}
}

/// Logs session activity through `tracing`.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn on_event(&self, event: &Event) {
        match event {
            Event::SessionStarted { .. } => tracing::info!("session started"),
            Event::TickRecorded {
                reading,
                classification,
                elapsed_ms,
                ..
            } => tracing::debug!(reading, ?classification, elapsed_ms, "tick recorded"),
            Event::TickSkipped { reason, .. } => tracing::debug!(%reason, "tick skipped"),
            other => tracing::trace!(?other, "session event"),
        }
    }

    fn on_session_complete(&self, summary: &SessionSummary) {
        tracing::info!(
            in_zone_ms = summary.in_zone.as_millis() as u64,
            out_of_zone_ms = summary.out_of_zone.as_millis() as u64,
            ratio = ?summary.in_zone_ratio,
            "session complete"
        );
    }
}

/// Writes finished sessions to the local history table.
pub struct HistoryRecorder {
    db: Mutex<Database>,
}

impl HistoryRecorder {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    pub fn into_inner(self) -> Database {
        match self.db.into_inner() {
            Ok(db) => db,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SessionObserver for HistoryRecorder {
    fn on_session_complete(&self, summary: &SessionSummary) {
        let Ok(db) = self.db.lock() else {
            tracing::warn!("session history lock poisoned; summary not recorded");
            return;
        };
        if let Err(e) = db.record_session(summary) {
            tracing::warn!(error = %e, "failed to record session");
        }
    }
}

/// Keeps every event, for tests and the CLI simulation.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
    summaries: Mutex<Vec<SessionSummary>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.summaries.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl SessionObserver for EventLog {
    fn on_event(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn on_session_complete(&self, summary: &SessionSummary) {
        if let Ok(mut summaries) = self.summaries.lock() {
            summaries.push(summary.clone());
        }
    }
}
