//! Transport seam for envelopes.
//!
//! Pairing and delivery mechanics live outside this crate; the core only
//! needs `send`. Inbound envelopes are handed to
//! [`PeerLink::on_receive`](super::PeerLink::on_receive).

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::envelope::EncodedEnvelope;
use crate::error::TransferError;

#[async_trait]
pub trait SyncTransport: Send + Sync {
    /// Hand one envelope to the channel. `Ok` means the channel accepted it.
    async fn send(&self, envelope: &EncodedEnvelope) -> Result<(), TransferError>;
}

/// In-process transport delivering to a paired [`LoopbackInbox`].
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    tx: mpsc::UnboundedSender<EncodedEnvelope>,
    online: Arc<AtomicBool>,
    attempts: Arc<AtomicU32>,
}

/// Receiving half of a loopback channel.
#[derive(Debug)]
pub struct LoopbackInbox {
    rx: mpsc::UnboundedReceiver<EncodedEnvelope>,
}

/// One side of a paired loopback link.
#[derive(Debug)]
pub struct LoopbackEnd {
    /// Sends to the other side.
    pub transport: LoopbackTransport,
    /// Receives from the other side.
    pub inbox: LoopbackInbox,
}

impl LoopbackTransport {
    /// Two ends wired to each other.
    pub fn pair() -> (LoopbackEnd, LoopbackEnd) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        let a = LoopbackEnd {
            transport: Self::new(a_tx),
            inbox: LoopbackInbox { rx: a_rx },
        };
        let b = LoopbackEnd {
            transport: Self::new(b_tx),
            inbox: LoopbackInbox { rx: b_rx },
        };
        (a, b)
    }

    fn new(tx: mpsc::UnboundedSender<EncodedEnvelope>) -> Self {
        Self {
            tx,
            online: Arc::new(AtomicBool::new(true)),
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// While offline every send fails with `Unreachable`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Number of `send` calls, successful or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SyncTransport for LoopbackTransport {
    async fn send(&self, envelope: &EncodedEnvelope) -> Result<(), TransferError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if !self.is_online() {
            return Err(TransferError::Unreachable);
        }
        self.tx.send(envelope.clone()).map_err(|_| TransferError::Closed)
    }
}

impl LoopbackInbox {
    pub async fn recv(&mut self) -> Option<EncodedEnvelope> {
        self.rx.recv().await
    }

    /// Next envelope already delivered, if any.
    pub fn try_recv(&mut self) -> Option<EncodedEnvelope> {
        self.rx.try_recv().ok()
    }

    /// Everything delivered so far.
    pub fn drain(&mut self) -> Vec<EncodedEnvelope> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}
