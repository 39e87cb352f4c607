//! Haptic alert plans and playback.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::engine::Classification;
use crate::settings::{HapticPattern, SettingsDocument};

/// The wearable's output device. Plays one pulse per call.
pub trait AlertDispatcher: Send + Sync {
    fn play(&self, pattern: HapticPattern);
}

/// A pattern repeated `repeats` times with `spacing` between pulses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertPlan {
    pub pattern: HapticPattern,
    pub repeats: u32,
    pub spacing: Duration,
}

impl AlertPlan {
    pub const BELOW_REPEATS: u32 = 4;
    pub const BELOW_SPACING: Duration = Duration::from_millis(250);
    pub const ABOVE_REPEATS: u32 = 2;
    pub const ABOVE_SPACING: Duration = Duration::from_millis(300);
    pub const IN_ZONE_REPEATS: u32 = 2;
    pub const IN_ZONE_SPACING: Duration = Duration::from_millis(250);

    /// Plan for a tick's classification under the current settings.
    pub fn for_classification(classification: Classification, settings: &SettingsDocument) -> Self {
        match classification {
            Classification::Below => Self {
                pattern: settings.faster_haptic.value,
                repeats: Self::BELOW_REPEATS,
                spacing: Self::BELOW_SPACING,
            },
            Classification::Above => Self {
                pattern: settings.slower_haptic.value,
                repeats: Self::ABOVE_REPEATS,
                spacing: Self::ABOVE_SPACING,
            },
            Classification::In => Self {
                pattern: settings.in_zone_haptic.value,
                repeats: if settings.in_zone_alerts.value {
                    Self::IN_ZONE_REPEATS
                } else {
                    0
                },
                spacing: Self::IN_ZONE_SPACING,
            },
        }
    }

    /// A single pulse, used for previews.
    pub fn once(pattern: HapticPattern) -> Self {
        Self {
            pattern,
            repeats: 1,
            spacing: Duration::ZERO,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.repeats == 0
    }
}

/// Plays alert plans on a background task so the caller never waits for
/// the pulses. Starting a new plan cancels one still playing.
pub struct AlertPlayer {
    dispatcher: Arc<dyn AlertDispatcher>,
    current: Mutex<Option<JoinHandle<()>>>,
}

impl AlertPlayer {
    pub fn new(dispatcher: Arc<dyn AlertDispatcher>) -> Self {
        Self {
            dispatcher,
            current: Mutex::new(None),
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn play(&self, plan: AlertPlan) {
        self.cancel();
        if plan.is_silent() {
            return;
        }
        let dispatcher = Arc::clone(&self.dispatcher);
        let handle = tokio::spawn(async move {
            for pulse in 0..plan.repeats {
                if pulse > 0 {
                    tokio::time::sleep(plan.spacing).await;
                }
                dispatcher.play(plan.pattern);
            }
        });
        if let Ok(mut current) = self.current.lock() {
            *current = Some(handle);
        }
    }

    pub fn cancel(&self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(handle) = current.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for AlertPlayer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Dispatcher that only logs, for headless runs.
#[derive(Debug, Default)]
pub struct LoggingDispatcher;

impl AlertDispatcher for LoggingDispatcher {
    fn play(&self, pattern: HapticPattern) {
        tracing::debug!(pattern = pattern.name(), "haptic pulse");
    }
}

/// Dispatcher that remembers every pulse.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    played: Mutex<Vec<HapticPattern>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<HapticPattern> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl AlertDispatcher for RecordingDispatcher {
    fn play(&self, pattern: HapticPattern) {
        if let Ok(mut played) = self.played.lock() {
            played.push(pattern);
        }
    }
}
