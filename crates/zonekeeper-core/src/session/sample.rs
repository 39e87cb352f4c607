//! Heart-rate sample sources.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::SampleError;

/// Whether the user allowed the app to read heart-rate data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Granted,
    Denied,
    /// Not asked yet. Treated as granted; a later denial surfaces per tick.
    NotDetermined,
}

impl Authorization {
    pub fn is_denied(self) -> bool {
        self == Authorization::Denied
    }
}

/// Provider of the most recent heart-rate reading, in beats per minute.
#[async_trait]
pub trait SampleSource: Send + Sync {
    fn authorization(&self) -> Authorization {
        Authorization::Granted
    }

    async fn fetch(&self) -> Result<u32, SampleError>;
}

/// One stretch of a scripted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    /// Report `reading` for `duration`.
    Reading { reading: u32, duration: Duration },
    /// Fail every fetch for `duration`.
    Unavailable { duration: Duration },
}

impl ScriptStep {
    fn duration(&self) -> Duration {
        match self {
            ScriptStep::Reading { duration, .. } | ScriptStep::Unavailable { duration } => *duration,
        }
    }
}

/// Replays a fixed timeline of readings against the tokio clock.
///
/// A fetch at instant `t` reports the step active at `t - 1ms`, so a tick
/// landing exactly on a step boundary still sees the step that just ended.
/// After the script runs out the last step repeats.
#[derive(Debug)]
pub struct ScriptedSource {
    steps: Vec<ScriptStep>,
    authorization: Authorization,
    origin: Mutex<Option<Instant>>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            authorization: Authorization::Granted,
            origin: Mutex::new(None),
        }
    }

    /// Each reading held for `per_reading`.
    pub fn from_readings(readings: &[u32], per_reading: Duration) -> Self {
        Self::new(
            readings
                .iter()
                .map(|&reading| ScriptStep::Reading {
                    reading,
                    duration: per_reading,
                })
                .collect(),
        )
    }

    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = authorization;
        self
    }

    /// Pin the script's time origin. Otherwise the first fetch sets it.
    pub fn begin_at(&self, origin: Instant) {
        if let Ok(mut slot) = self.origin.lock() {
            *slot = Some(origin);
        }
    }

    /// Total scripted time.
    pub fn length(&self) -> Duration {
        self.steps.iter().map(ScriptStep::duration).sum()
    }

    fn step_at(&self, offset: Duration) -> Option<&ScriptStep> {
        let mut end = Duration::ZERO;
        for step in &self.steps {
            end += step.duration();
            if offset < end {
                return Some(step);
            }
        }
        self.steps.last()
    }
}

#[async_trait]
impl SampleSource for ScriptedSource {
    fn authorization(&self) -> Authorization {
        self.authorization
    }

    async fn fetch(&self) -> Result<u32, SampleError> {
        if self.authorization.is_denied() {
            return Err(SampleError::AuthorizationDenied);
        }
        let now = Instant::now();
        let origin = match self.origin.lock() {
            Ok(mut slot) => *slot.get_or_insert(now),
            Err(_) => return Err(SampleError::Source("script clock poisoned".into())),
        };
        let offset = now
            .saturating_duration_since(origin)
            .saturating_sub(Duration::from_millis(1));

        match self.step_at(offset) {
            Some(ScriptStep::Reading { reading, .. }) => Ok(*reading),
            Some(ScriptStep::Unavailable { .. }) | None => Err(SampleError::Unavailable),
        }
    }
}

/// Always reports the same reading.
#[derive(Debug, Clone, Copy)]
pub struct ConstantSource(pub u32);

#[async_trait]
impl SampleSource for ConstantSource {
    async fn fetch(&self) -> Result<u32, SampleError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn scripted_source_follows_timeline() {
        let source = ScriptedSource::new(vec![
            ScriptStep::Reading {
                reading: 110,
                duration: Duration::from_secs(8),
            },
            ScriptStep::Unavailable {
                duration: Duration::from_secs(4),
            },
            ScriptStep::Reading {
                reading: 150,
                duration: Duration::from_secs(4),
            },
        ]);
        source.begin_at(Instant::now());
        assert_eq!(source.length(), Duration::from_secs(16));

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(source.fetch().await.unwrap(), 110);
        tokio::time::sleep(Duration::from_secs(4)).await;
        // Boundary tick still sees the step that just ended.
        assert_eq!(source.fetch().await.unwrap(), 110);
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(source.fetch().await, Err(SampleError::Unavailable));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(source.fetch().await.unwrap(), 150);
    }

    #[tokio::test]
    async fn denied_source_fails_every_fetch() {
        let source = ScriptedSource::from_readings(&[120], Duration::from_secs(1))
            .with_authorization(Authorization::Denied);
        assert!(source.authorization().is_denied());
        assert_eq!(source.fetch().await, Err(SampleError::AuthorizationDenied));
    }

    #[tokio::test]
    async fn constant_source_never_fails() {
        assert_eq!(ConstantSource(133).fetch().await.unwrap(), 133);
    }
}
