//! Core types for the peer link.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::SyncConfig;

/// Most recent transfer that ran out of attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferFailure {
    pub at: DateTime<Utc>,
    /// Wire key of the envelope that was dropped.
    pub kind: String,
    pub error: String,
}

/// Current link status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Envelopes queued or in flight.
    pub pending_count: usize,
    /// Envelopes delivered since startup.
    pub delivered: u64,
    /// Envelopes dropped after exhausting their attempts.
    pub dropped: u64,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure: Option<TransferFailure>,
}

impl SyncStatus {
    pub fn is_idle(&self) -> bool {
        self.pending_count == 0
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Upper bound on any single delay.
    pub const MAX_DELAY: Duration = Duration::from_secs(60);

    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Deliver once, never retry.
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay before retry number `retry` (zero-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.checked_pow(retry).unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor).min(Self::MAX_DELAY)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for RetryPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self::new(config.max_retries, config.retry_backoff())
    }
}
