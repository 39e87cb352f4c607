//! # Zonekeeper Core Library
//!
//! Core logic for a heart-rate zone trainer split across a phone and a
//! wearable. The CLI binary drives the same library a device app would.
//!
//! ## Architecture
//!
//! - **Settings**: a document of last-writer-wins registers that both
//!   devices edit independently and reconcile field by field
//! - **Sync**: envelope codec, fire-and-forget outbox with bounded retry,
//!   and routing of inbound envelopes
//! - **Zone**: pure zone boundary and maximum heart rate arithmetic
//! - **Session**: a clock-driven engine plus the async tick loop that feeds
//!   it readings and plays alerts
//! - **Storage**: SQLite key/value blobs and session history, TOML config
//!
//! ## Key Components
//!
//! - [`SettingsSynchronizer`]: single entry point for document changes
//! - [`PeerLink`]: inbound envelope routing
//! - [`SessionController`]: tick loop driver
//! - [`SessionEngine`]: session state machine
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod session;
pub mod settings;
pub mod storage;
pub mod sync;
pub mod zone;

pub use error::{ConfigError, CoreError, DecodeError, SampleError, SessionError, StorageError, TransferError};
pub use events::Event;
pub use session::{
    AlertDispatcher, AlertPlan, AlertPlayer, Classification, SampleSource, SessionController, SessionEngine,
    SessionObserver, SessionPhase, SessionSummary,
};
pub use settings::{merge, ColorSetting, HapticPattern, SettingsDocument, SettingsEdit, TimestampedValue};
pub use storage::{BlobStore, Config, Database, MemoryStore};
pub use sync::{Outbox, PeerLink, SettingsSynchronizer, SyncEnvelope, SyncTransport};
pub use zone::{boundaries, MaxRate, ZoneBand, ZoneBounds, DEFAULT_MAX_RATE};
