//! Async driver for the session engine.
//!
//! One tokio task per active session runs the tick loop. Ticks never
//! overlap: the loop awaits each tick body before waiting for the next
//! interval, and `stop()` lets an in-flight tick finish before the totals
//! are frozen. A fetch that outlives the tick interval is abandoned and
//! counted as unavailable, so `stop()` waits at most one interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};

use super::alert::{AlertPlan, AlertPlayer};
use super::engine::{SessionEngine, SessionPhase, SessionState, SessionSummary};
use super::observer::SessionObserver;
use super::sample::SampleSource;
use crate::error::{SampleError, SessionError};
use crate::events::Event;
use crate::sync::SettingsSynchronizer;
use crate::zone::{boundaries, DEFAULT_MAX_RATE};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(4);

struct Running {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Everything a tick needs, cloned into the loop task.
#[derive(Clone)]
struct TickContext {
    engine: Arc<Mutex<SessionEngine>>,
    source: Arc<dyn SampleSource>,
    settings: Arc<SettingsSynchronizer>,
    alerts: Arc<AlertPlayer>,
    observers: Arc<[Arc<dyn SessionObserver>]>,
    max_rate: u32,
    fetch_timeout: Duration,
}

pub struct SessionController {
    engine: Arc<Mutex<SessionEngine>>,
    source: Arc<dyn SampleSource>,
    settings: Arc<SettingsSynchronizer>,
    alerts: Arc<AlertPlayer>,
    observers: Vec<Arc<dyn SessionObserver>>,
    tick_interval: Duration,
    max_rate: u32,
    running: Mutex<Option<Running>>,
}

impl SessionController {
    pub fn new(
        source: Arc<dyn SampleSource>,
        settings: Arc<SettingsSynchronizer>,
        alerts: Arc<AlertPlayer>,
    ) -> Self {
        Self {
            engine: Arc::new(Mutex::new(SessionEngine::new())),
            source,
            settings,
            alerts,
            observers: Vec::new(),
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_rate: DEFAULT_MAX_RATE,
            running: Mutex::new(None),
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_max_rate(mut self, max_rate: u32) -> Self {
        self.max_rate = max_rate;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn max_rate(&self) -> u32 {
        self.max_rate
    }

    pub async fn phase(&self) -> SessionPhase {
        self.engine.lock().await.phase()
    }

    pub async fn state(&self) -> SessionState {
        self.engine.lock().await.state().clone()
    }

    pub async fn snapshot(&self) -> Event {
        self.engine.lock().await.snapshot()
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }

    /// Start a session and its tick loop.
    ///
    /// Returns `Ok(false)` when a session is already running.
    ///
    /// # Errors
    /// `SessionError::AuthorizationDenied` when the sample source refused
    /// access; nothing is started.
    pub async fn start(&self) -> Result<bool, SessionError> {
        if self.source.authorization().is_denied() {
            tracing::warn!("heart rate access denied; session not started");
            return Err(SessionError::AuthorizationDenied);
        }

        let mut running = self.running.lock().await;
        if running.is_some() {
            return Ok(false);
        }

        let started = Instant::now();
        let Some(event) = self.engine.lock().await.start(started) else {
            return Ok(false);
        };
        let ctx = self.context();
        notify(&ctx.observers, &event);

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(ctx, started, self.tick_interval, stop_rx));
        *running = Some(Running { stop_tx, handle });
        Ok(true)
    }

    /// Stop the loop, let an in-flight tick finish, then freeze the totals.
    ///
    /// Returns `None` when no session was active.
    pub async fn stop(&self) -> Option<SessionSummary> {
        let running = self.running.lock().await.take();
        if let Some(Running { stop_tx, handle }) = running {
            let _ = stop_tx.send(true);
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "session loop ended abnormally");
            }
        }

        let summary = self.engine.lock().await.stop()?;
        let event = Event::SessionStopped {
            summary: summary.clone(),
        };
        for observer in &self.observers {
            observer.on_event(&event);
            observer.on_session_complete(&summary);
        }
        Some(summary)
    }

    /// Remote start (`true`) or stop (`false`) from the peer.
    pub async fn apply_signal(&self, started: bool) -> Result<(), SessionError> {
        if started {
            self.start().await.map(|_| ())
        } else {
            self.stop().await;
            Ok(())
        }
    }

    fn context(&self) -> TickContext {
        TickContext {
            engine: Arc::clone(&self.engine),
            source: Arc::clone(&self.source),
            settings: Arc::clone(&self.settings),
            alerts: Arc::clone(&self.alerts),
            observers: self.observers.clone().into(),
            max_rate: self.max_rate,
            fetch_timeout: self.tick_interval,
        }
    }
}

async fn run_loop(ctx: TickContext, started: Instant, period: Duration, mut stop_rx: watch::Receiver<bool>) {
    let mut ticks = interval_at(started + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = ticks.tick() => ctx.tick().await,
        }
    }
    tracing::debug!("session loop stopped");
}

impl TickContext {
    async fn tick(&self) {
        let fetched = timeout(self.fetch_timeout, self.source.fetch())
            .await
            .unwrap_or(Err(SampleError::TimedOut(self.fetch_timeout)));
        let reading = match fetched {
            Ok(reading) => reading,
            Err(e) => {
                let skipped = self.engine.lock().await.record_unavailable(&e.to_string());
                if let Some(event) = skipped {
                    notify(&self.observers, &event);
                }
                return;
            }
        };

        // Read per tick so merged remote edits apply on the next tick.
        let settings = self.settings.document();
        let bounds = boundaries(settings.heart_rate_zone.value, self.max_rate);
        let outcome = self
            .engine
            .lock()
            .await
            .record_sample(reading, bounds, Instant::now());
        let Some(outcome) = outcome else {
            return;
        };

        self.alerts
            .play(AlertPlan::for_classification(outcome.classification, &settings));
        notify(&self.observers, &outcome.to_event());
    }
}

fn notify(observers: &[Arc<dyn SessionObserver>], event: &Event) {
    for observer in observers {
        observer.on_event(event);
    }
}
