//! Routing of inbound envelopes, and sending of non-settings envelopes.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;

use super::envelope::{HapticDemoRequest, SyncEnvelope};
use super::outbox::Outbox;
use super::synchronizer::{MergeOutcome, SettingsSynchronizer};
use super::transport::LoopbackInbox;
use crate::error::DecodeError;
use crate::events::Event;
use crate::session::{AlertPlan, AlertPlayer, SessionController, SessionObserver};

/// What an inbound envelope led to.
#[derive(Debug, Clone, PartialEq)]
pub enum Received {
    Settings(MergeOutcome),
    /// `applied` is false when no controller is attached or the start was
    /// refused.
    SessionSignal { started: bool, applied: bool },
    HapticDemo(HapticDemoRequest),
    /// Superseded by the settings document.
    LegacyBoundsIgnored,
}

/// One device's end of the phone/wearable link.
pub struct PeerLink {
    settings: Arc<SettingsSynchronizer>,
    session: Option<Arc<SessionController>>,
    alerts: Option<Arc<AlertPlayer>>,
    outbox: Option<Arc<Outbox>>,
    observers: Vec<Arc<dyn SessionObserver>>,
}

impl PeerLink {
    pub fn new(settings: Arc<SettingsSynchronizer>) -> Self {
        Self {
            settings,
            session: None,
            alerts: None,
            outbox: None,
            observers: Vec::new(),
        }
    }

    pub fn with_session(mut self, session: Arc<SessionController>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_alerts(mut self, alerts: Arc<AlertPlayer>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn with_outbox(mut self, outbox: Arc<Outbox>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn settings(&self) -> &Arc<SettingsSynchronizer> {
        &self.settings
    }

    /// Decode `payload` once and hand it to whoever owns that payload.
    ///
    /// # Errors
    /// Returns the decode error for a malformed envelope. Local state is
    /// left untouched in that case.
    pub async fn on_receive(&self, payload: &[u8]) -> Result<Received, DecodeError> {
        let decoded = SyncEnvelope::decode(payload).inspect_err(|e| {
            tracing::warn!(error = %e, "dropping undecodable envelope");
        })?;
        let origin = decoded.origin.as_deref().unwrap_or("unknown");
        tracing::debug!(origin, kind = decoded.envelope.kind(), "envelope received");

        let received = match decoded.envelope {
            SyncEnvelope::Settings(remote) => {
                let outcome = self.settings.merge_remote(remote);
                if outcome.changed {
                    self.notify(&Event::SettingsMerged {
                        echoed: outcome.echoed,
                        at: Utc::now(),
                    });
                }
                Received::Settings(outcome)
            }
            SyncEnvelope::SessionSignal(started) => {
                let applied = match &self.session {
                    Some(session) => match session.apply_signal(started).await {
                        Ok(()) => true,
                        Err(e) => {
                            tracing::warn!(error = %e, "remote session signal refused");
                            false
                        }
                    },
                    None => false,
                };
                Received::SessionSignal { started, applied }
            }
            SyncEnvelope::HapticDemo(request) => {
                self.play_demo(request);
                Received::HapticDemo(request)
            }
            SyncEnvelope::LegacyBounds { lower, upper } => {
                tracing::info!(lower, upper, "ignoring legacy boundary push");
                Received::LegacyBoundsIgnored
            }
        };
        Ok(received)
    }

    /// Send a non-settings envelope to the peer. Settings go through the
    /// synchronizer. Returns false when there is no outbox.
    pub fn send(&self, envelope: SyncEnvelope) -> bool {
        let Some(outbox) = &self.outbox else {
            return false;
        };
        match envelope.encode(self.settings.origin()) {
            Ok(encoded) => {
                outbox.enqueue(envelope.kind(), encoded);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = envelope.kind(), "failed to encode envelope");
                false
            }
        }
    }

    /// Feed every envelope arriving on `inbox` into [`Self::on_receive`].
    pub fn spawn_inbox(self: Arc<Self>, mut inbox: LoopbackInbox) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(envelope) = inbox.recv().await {
                // Errors are already logged by on_receive.
                let _ = self.on_receive(&envelope.bytes).await;
            }
        })
    }

    fn play_demo(&self, request: HapticDemoRequest) {
        let pattern = request
            .pattern
            .unwrap_or_else(|| self.settings.document().faster_haptic.value);
        if let Some(alerts) = &self.alerts {
            if request.running {
                alerts.play(AlertPlan::once(pattern));
            } else {
                alerts.cancel();
            }
        }
        self.notify(&Event::HapticDemo {
            running: request.running,
            pattern: request.running.then_some(pattern),
            at: Utc::now(),
        });
    }

    fn notify(&self, event: &Event) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
