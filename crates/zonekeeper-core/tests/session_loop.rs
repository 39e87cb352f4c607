//! Session controller driven by a scripted sample source on a paused clock.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use zonekeeper_core::error::{SampleError, SessionError};
use zonekeeper_core::session::{
    AlertPlayer, Authorization, EventLog, HistoryRecorder, RecordingDispatcher, SampleSource, ScriptStep,
    ScriptedSource, SessionController, SessionPhase,
};
use zonekeeper_core::settings::{HapticPattern, SettingsEdit};
use zonekeeper_core::storage::{Database, MemoryStore};
use zonekeeper_core::sync::{PeerLink, Received, SettingsSynchronizer};
use zonekeeper_core::zone::ZoneBand;
use zonekeeper_core::Event;

const MAX_RATE: u32 = 182;

fn reading(reading: u32, secs: u64) -> ScriptStep {
    ScriptStep::Reading {
        reading,
        duration: Duration::from_secs(secs),
    }
}

fn zone1_settings() -> Arc<SettingsSynchronizer> {
    let settings = SettingsSynchronizer::load(Box::new(MemoryStore::new()), "zonekeeper-watch");
    settings.apply_local_edit(SettingsEdit::HeartRateZone(ZoneBand::Zone1));
    Arc::new(settings)
}

struct Rig {
    controller: SessionController,
    source: Arc<ScriptedSource>,
    recorder: Arc<RecordingDispatcher>,
    log: Arc<EventLog>,
}

fn rig(source: ScriptedSource, settings: Arc<SettingsSynchronizer>) -> Rig {
    let source = Arc::new(source);
    let recorder = Arc::new(RecordingDispatcher::new());
    let log = Arc::new(EventLog::new());
    let controller = SessionController::new(
        source.clone(),
        settings,
        Arc::new(AlertPlayer::new(recorder.clone())),
    )
    .with_max_rate(MAX_RATE)
    .with_observer(log.clone());
    Rig {
        controller,
        source,
        recorder,
        log,
    }
}

/// Answers every fetch with the same reading after `delay`.
struct SlowSource {
    reading: u32,
    delay: Duration,
    fetches: AtomicU32,
}

impl SlowSource {
    fn new(reading: u32, delay: Duration) -> Self {
        Self {
            reading,
            delay,
            fetches: AtomicU32::new(0),
        }
    }

    fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SampleSource for SlowSource {
    async fn fetch(&self) -> Result<u32, SampleError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.reading)
    }
}

fn slow_controller(source: Arc<SlowSource>) -> (SessionController, Arc<EventLog>) {
    let log = Arc::new(EventLog::new());
    let controller = SessionController::new(
        source,
        zone1_settings(),
        Arc::new(AlertPlayer::new(Arc::new(RecordingDispatcher::new()))),
    )
    .with_max_rate(MAX_RATE)
    .with_observer(log.clone());
    (controller, log)
}

#[tokio::test(start_paused = true)]
async fn phased_workout_accumulates_expected_totals() {
    // Zone 1 at 182 bpm is 123..=132.
    let rig = rig(
        ScriptedSource::new(vec![
            reading(110, 20),
            reading(125, 40),
            reading(150, 40),
            reading(125, 40),
            reading(150, 60),
            reading(125, 20),
        ]),
        zone1_settings(),
    );

    rig.source.begin_at(Instant::now());
    assert!(rig.controller.start().await.unwrap());
    tokio::time::sleep(Duration::from_secs(222)).await;
    let summary = rig.controller.stop().await.unwrap();

    assert_eq!(summary.in_zone, Duration::from_secs(100));
    assert_eq!(summary.out_of_zone, Duration::from_secs(120));
    assert_eq!(summary.total, Duration::from_secs(220));
    assert!((summary.in_zone_ratio.unwrap() - 100.0 / 220.0).abs() < 1e-9);
    assert_eq!(rig.controller.phase().await, SessionPhase::Stopped);

    let ticks = rig
        .log
        .events()
        .iter()
        .filter(|e| matches!(e, Event::TickRecorded { .. }))
        .count();
    assert_eq!(ticks, 55);
    assert_eq!(rig.log.summaries(), vec![summary]);
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_does_not_advance_anchor() {
    let rig = rig(
        ScriptedSource::new(vec![
            reading(125, 4),
            ScriptStep::Unavailable {
                duration: Duration::from_secs(8),
            },
            reading(150, 4),
        ]),
        zone1_settings(),
    );

    rig.source.begin_at(Instant::now());
    rig.controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(17)).await;
    let summary = rig.controller.stop().await.unwrap();

    // t=4 in zone; t=8 and t=12 skipped; t=16 charges 12 s to out of zone.
    assert_eq!(summary.in_zone, Duration::from_secs(4));
    assert_eq!(summary.out_of_zone, Duration::from_secs(12));

    let events = rig.log.events();
    let skipped = events
        .iter()
        .filter(|e| matches!(e, Event::TickSkipped { .. }))
        .count();
    assert_eq!(skipped, 2);
    assert!(events.iter().any(|e| matches!(
        e,
        Event::TickRecorded {
            reading: 150,
            elapsed_ms: 12_000,
            ..
        }
    )));
}

#[tokio::test]
async fn denied_authorization_prevents_start() {
    let rig = rig(
        ScriptedSource::from_readings(&[125], Duration::from_secs(4)).with_authorization(Authorization::Denied),
        zone1_settings(),
    );
    assert_eq!(rig.controller.start().await, Err(SessionError::AuthorizationDenied));
    assert_eq!(rig.controller.phase().await, SessionPhase::Idle);
    assert!(!rig.controller.is_running().await);
    assert!(rig.log.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn immediate_stop_has_no_ratio() {
    let rig = rig(ScriptedSource::from_readings(&[125], Duration::from_secs(4)), zone1_settings());
    rig.controller.start().await.unwrap();
    let summary = rig.controller.stop().await.unwrap();
    assert_eq!(summary.total, Duration::ZERO);
    assert_eq!(summary.in_zone_ratio, None);
    assert!(rig.controller.stop().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn second_start_while_running_is_ignored() {
    let rig = rig(ScriptedSource::from_readings(&[125], Duration::from_secs(4)), zone1_settings());
    assert!(rig.controller.start().await.unwrap());
    assert!(!rig.controller.start().await.unwrap());
    rig.controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn alerts_follow_classification() {
    let settings = zone1_settings();
    settings.apply_local_edit(SettingsEdit::FasterHaptic(HapticPattern::DirectionUp));
    let rig = rig(ScriptedSource::from_readings(&[100], Duration::from_secs(60)), settings);

    rig.source.begin_at(Instant::now());
    rig.controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    rig.controller.stop().await;

    assert_eq!(rig.recorder.played(), vec![HapticPattern::DirectionUp; 4]);
}

#[tokio::test(start_paused = true)]
async fn merged_zone_change_applies_on_next_tick() {
    let settings = zone1_settings();
    let rig = rig(ScriptedSource::from_readings(&[150], Duration::from_secs(60)), Arc::clone(&settings));

    rig.source.begin_at(Instant::now());
    rig.controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    // Zone 3 at 182 is 145..=158.
    settings.apply_local_edit(SettingsEdit::HeartRateZone(ZoneBand::Zone3));
    tokio::time::sleep(Duration::from_secs(4)).await;
    let summary = rig.controller.stop().await.unwrap();

    assert_eq!(summary.out_of_zone, Duration::from_secs(4));
    assert_eq!(summary.in_zone, Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn remote_signal_starts_and_stops_session() {
    let settings = zone1_settings();
    let rig = rig(ScriptedSource::from_readings(&[125], Duration::from_secs(60)), Arc::clone(&settings));
    let controller = Arc::new(rig.controller);
    let link = PeerLink::new(settings).with_session(Arc::clone(&controller));

    let started = link.on_receive(br#"{"workoutIsStarted":true}"#).await.unwrap();
    assert_eq!(
        started,
        Received::SessionSignal {
            started: true,
            applied: true
        }
    );
    assert!(controller.is_running().await);

    tokio::time::sleep(Duration::from_secs(9)).await;
    link.on_receive(br#"{"workoutIsStarted":false}"#).await.unwrap();
    assert!(!controller.is_running().await);
    assert_eq!(controller.phase().await, SessionPhase::Stopped);
    assert_eq!(rig.log.summaries()[0].in_zone, Duration::from_secs(8));
}

#[tokio::test(start_paused = true)]
async fn history_recorder_keeps_finished_sessions() {
    let source = Arc::new(ScriptedSource::from_readings(&[125], Duration::from_secs(60)));
    let history = Arc::new(HistoryRecorder::new(Database::open_memory().unwrap()));
    let controller = SessionController::new(
        source.clone(),
        zone1_settings(),
        Arc::new(AlertPlayer::new(Arc::new(RecordingDispatcher::new()))),
    )
    .with_max_rate(MAX_RATE)
    .with_tick_interval(Duration::from_secs(2))
    .with_observer(history.clone());

    source.begin_at(Instant::now());
    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(7)).await;
    controller.stop().await;
    drop(controller);

    let db = Arc::try_unwrap(history).ok().unwrap().into_inner();
    let records = db.recent_sessions(10).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].in_zone_ms, 6_000);
    assert_eq!(records[0].in_zone_ratio, Some(1.0));
}

#[tokio::test(start_paused = true)]
async fn stop_during_fetch_counts_the_in_flight_tick() {
    // First tick at 4 s; its reading arrives at 6 s. Stop is requested at 5 s.
    let source = Arc::new(SlowSource::new(125, Duration::from_secs(2)));
    let (controller, log) = slow_controller(source.clone());

    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(source.fetches(), 1);

    let summary = controller.stop().await.unwrap();
    assert_eq!(summary.in_zone, Duration::from_secs(6));
    assert_eq!(summary.total, Duration::from_secs(6));

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(source.fetches(), 1);
    let recorded = log
        .events()
        .iter()
        .filter(|e| matches!(e, Event::TickRecorded { .. }))
        .count();
    assert_eq!(recorded, 1);
}

#[tokio::test(start_paused = true)]
async fn stop_returns_when_fetch_never_answers() {
    let source = Arc::new(SlowSource::new(125, Duration::from_secs(3600)));
    let (controller, log) = slow_controller(source.clone());

    controller.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let stopped_at = Instant::now();
    let summary = tokio::time::timeout(Duration::from_secs(60), controller.stop())
        .await
        .expect("stop hung on a stalled fetch")
        .unwrap();
    // The stalled fetch is abandoned one interval after it began.
    assert_eq!(Instant::now() - stopped_at, Duration::from_secs(3));
    assert_eq!(summary.total, Duration::ZERO);
    assert_eq!(summary.in_zone_ratio, None);
    assert!(matches!(
        log.events().as_slice(),
        [Event::SessionStarted { .. }, Event::TickSkipped { .. }, Event::SessionStopped { .. }]
    ));
}
