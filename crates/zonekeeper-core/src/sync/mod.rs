//! Phone/wearable synchronization layer.
//!
//! Settings travel as whole documents and are reconciled field by field;
//! session signals and haptic previews travel as one-shot envelopes. All
//! outbound traffic goes through an [`Outbox`] so callers never wait on the
//! transport.

pub mod device_id;
pub mod envelope;
mod link;
mod outbox;
mod synchronizer;
pub mod transport;
pub mod types;

#[cfg(test)]
mod envelope_tests;

pub use device_id::{ephemeral_device_id, get_or_create_device_id, get_or_create_device_id_at, DeviceIdError};
pub use envelope::{DecodedEnvelope, EncodedEnvelope, HapticDemoRequest, SyncEnvelope};
pub use link::{PeerLink, Received};
pub use outbox::{deliver, Outbox};
pub use synchronizer::{MergeOutcome, SettingsSynchronizer, SETTINGS_STORAGE_KEY};
pub use transport::{LoopbackEnd, LoopbackInbox, LoopbackTransport, SyncTransport};
pub use types::{RetryPolicy, SyncStatus, TransferFailure};
