//! Single entry point for every change to the settings document.
//!
//! Local edits and inbound snapshots both go through one mutex that owns the
//! document and its store, so readers only ever see whole documents and a
//! change is persisted before the lock is released.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::envelope::SyncEnvelope;
use super::outbox::Outbox;
use crate::settings::{merge, SettingsDocument, SettingsEdit};
use crate::storage::BlobStore;

/// Storage key of the encoded document.
pub const SETTINGS_STORAGE_KEY: &str = "settings";

/// What a merge with a peer copy did.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub document: SettingsDocument,
    /// The local document changed.
    pub changed: bool,
    /// The merged document was sent back to the peer.
    pub echoed: bool,
}

struct Shared {
    document: SettingsDocument,
    store: Box<dyn BlobStore>,
}

pub struct SettingsSynchronizer {
    shared: Mutex<Shared>,
    origin: String,
    outbox: Option<Arc<Outbox>>,
}

impl SettingsSynchronizer {
    /// Restore the persisted document from `store`. Missing or unreadable
    /// blobs yield the defaults.
    pub fn load(store: Box<dyn BlobStore>, origin: impl Into<String>) -> Self {
        let document = match store.get(SETTINGS_STORAGE_KEY) {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "stored settings are unreadable; using defaults");
                SettingsDocument::default()
            }),
            Ok(None) => SettingsDocument::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored settings; using defaults");
                SettingsDocument::default()
            }
        };
        Self {
            shared: Mutex::new(Shared { document, store }),
            origin: origin.into(),
            outbox: None,
        }
    }

    /// Send changes to the peer through `outbox`.
    pub fn with_outbox(mut self, outbox: Arc<Outbox>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Copy of the current document.
    pub fn document(&self) -> SettingsDocument {
        self.lock().document.clone()
    }

    /// Apply a local edit, persist it and push the whole document.
    pub fn apply_local_edit(&self, edit: SettingsEdit) -> SettingsDocument {
        let mut shared = self.lock();
        shared.document.apply(edit);
        persist(&mut shared);
        self.push(&shared.document);
        shared.document.clone()
    }

    /// Restamp every field with its factory value.
    pub fn reset(&self) -> SettingsDocument {
        let mut shared = self.lock();
        for edit in SettingsDocument::default().edits() {
            shared.document.apply(edit);
        }
        persist(&mut shared);
        self.push(&shared.document);
        shared.document.clone()
    }

    /// Decode an inbound envelope and merge it if it carries settings.
    /// Anything else, including a malformed envelope, leaves the document
    /// untouched.
    pub fn receive_remote(&self, payload: &[u8]) -> SettingsDocument {
        match SyncEnvelope::decode(payload) {
            Ok(decoded) => match decoded.envelope {
                SyncEnvelope::Settings(remote) => self.merge_remote(remote).document,
                other => {
                    tracing::debug!(kind = other.kind(), "envelope carries no settings");
                    self.document()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "dropping undecodable envelope");
                self.document()
            }
        }
    }

    /// Merge a peer's copy into the local document.
    ///
    /// The merged result is sent back only when it differs from what the
    /// peer sent, so a remote-only change is never echoed.
    pub fn merge_remote(&self, remote: SettingsDocument) -> MergeOutcome {
        let mut shared = self.lock();
        let merged = merge(&shared.document, &remote);
        let changed = merged != shared.document;
        if changed {
            shared.document = merged.clone();
            persist(&mut shared);
        }
        let echoed = merged != remote;
        if echoed {
            self.push(&merged);
        }
        tracing::debug!(changed, echoed, "merged remote settings");
        MergeOutcome {
            document: merged,
            changed,
            echoed,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, document: &SettingsDocument) {
        let Some(outbox) = &self.outbox else {
            return;
        };
        let envelope = SyncEnvelope::Settings(document.clone());
        match envelope.encode(&self.origin) {
            Ok(encoded) => outbox.enqueue(envelope.kind(), encoded),
            Err(e) => tracing::warn!(error = %e, "failed to encode settings envelope"),
        }
    }
}

fn persist(shared: &mut Shared) {
    let bytes = match serde_json::to_vec(&shared.document) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode settings for storage");
            return;
        }
    };
    if let Err(e) = shared.store.set(SETTINGS_STORAGE_KEY, &bytes) {
        tracing::warn!(error = %e, "failed to persist settings; keeping them in memory");
    }
}
