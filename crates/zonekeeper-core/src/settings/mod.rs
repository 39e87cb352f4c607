//! Settings shared between the phone and the wearable.
//!
//! The document is a fixed set of last-writer-wins registers; see
//! [`merge`] for how two copies are reconciled.

mod document;
mod timestamped;

pub use document::{merge, ColorSetting, HapticPattern, SettingsDocument, SettingsEdit};
pub use timestamped::TimestampedValue;
