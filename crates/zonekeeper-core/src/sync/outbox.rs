//! Fire-and-forget envelope queue.
//!
//! Callers enqueue and return immediately. A single worker task drains the
//! queue in order, retrying each envelope under a [`RetryPolicy`] and
//! dropping it once the attempts run out.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::envelope::EncodedEnvelope;
use super::transport::SyncTransport;
use super::types::{RetryPolicy, SyncStatus, TransferFailure};
use crate::error::TransferError;

struct Outgoing {
    kind: &'static str,
    envelope: EncodedEnvelope,
}

pub struct Outbox {
    tx: mpsc::UnboundedSender<Outgoing>,
    status: Arc<watch::Sender<SyncStatus>>,
    worker: JoinHandle<()>,
}

impl Outbox {
    /// Start the worker. Must be called from within a tokio runtime.
    pub fn spawn(transport: Arc<dyn SyncTransport>, policy: RetryPolicy) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status, _) = watch::channel(SyncStatus::default());
        let status = Arc::new(status);
        let worker = tokio::spawn(run_worker(rx, transport, policy, Arc::clone(&status)));
        Self { tx, status, worker }
    }

    /// Queue `envelope` for delivery. `kind` names it in logs and status.
    pub fn enqueue(&self, kind: &'static str, envelope: EncodedEnvelope) {
        self.status.send_modify(|s| s.pending_count += 1);
        if self.tx.send(Outgoing { kind, envelope }).is_err() {
            self.status.send_modify(|s| s.pending_count = s.pending_count.saturating_sub(1));
            tracing::warn!(kind, error = %TransferError::Closed, "outbox worker is gone; envelope dropped");
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Wait until every queued envelope was delivered or dropped.
    pub async fn idle(&self) {
        let mut rx = self.status.subscribe();
        let _ = rx.wait_for(SyncStatus::is_idle).await;
    }
}

impl Drop for Outbox {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<Outgoing>,
    transport: Arc<dyn SyncTransport>,
    policy: RetryPolicy,
    status: Arc<watch::Sender<SyncStatus>>,
) {
    while let Some(Outgoing { kind, envelope }) = rx.recv().await {
        let result = deliver(transport.as_ref(), &envelope, policy).await;
        status.send_modify(|s| {
            s.pending_count = s.pending_count.saturating_sub(1);
            match &result {
                Ok(_) => {
                    s.delivered += 1;
                    s.last_success_at = Some(Utc::now());
                }
                Err(e) => {
                    s.dropped += 1;
                    s.last_failure = Some(TransferFailure {
                        at: Utc::now(),
                        kind: kind.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        });
        match result {
            Ok(attempts) => tracing::debug!(kind, attempts, "envelope delivered"),
            Err(e) => tracing::warn!(kind, error = %e, "envelope dropped"),
        }
    }
}

/// Try `envelope` up to `policy.attempts()` times. Returns the number of
/// attempts used on success.
pub async fn deliver(
    transport: &dyn SyncTransport,
    envelope: &EncodedEnvelope,
    policy: RetryPolicy,
) -> Result<u32, TransferError> {
    let attempts = policy.attempts();
    for attempt in 0..attempts {
        if attempt > 0 {
            tokio::time::sleep(policy.delay_for(attempt - 1)).await;
        }
        match transport.send(envelope).await {
            Ok(()) => return Ok(attempt + 1),
            Err(TransferError::Closed) => return Err(TransferError::Closed),
            Err(e) => {
                tracing::warn!(attempt = attempt + 1, max_attempts = attempts, error = %e, "transfer attempt failed");
            }
        }
    }
    Err(TransferError::RetriesExhausted { attempts })
}
