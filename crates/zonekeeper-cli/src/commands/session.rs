use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::Subcommand;
use serde_json::json;
use zonekeeper_core::session::{
    AlertPlayer, EventLog, HistoryRecorder, LoggingDispatcher, ScriptedSource, SessionController, TracingObserver,
};
use zonekeeper_core::storage::{Database, MemoryStore};
use zonekeeper_core::sync::{ephemeral_device_id, SettingsSynchronizer};
use zonekeeper_core::{Config, Event};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a session against a scripted list of readings
    Simulate {
        /// Comma-separated readings, one per tick (e.g. "110,125,150")
        #[arg(long, value_delimiter = ',', required = true)]
        readings: Vec<u32>,
        /// Tick interval in milliseconds; defaults to the configured interval
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Maximum heart rate; defaults to the configured profile
        #[arg(long)]
        max_rate: Option<u32>,
        /// Use factory settings instead of the stored document
        #[arg(long)]
        defaults: bool,
        /// Store the finished session in the local history
        #[arg(long)]
        record: bool,
        /// Print every tick event
        #[arg(long)]
        events: bool,
    },
    /// Recently finished sessions
    History {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Simulate {
            readings,
            interval_ms,
            max_rate,
            defaults,
            record,
            events,
        } => {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
            let interval = match interval_ms {
                Some(ms) => Duration::from_millis(ms.max(1)),
                None => Config::load_or_default().session.tick_interval(),
            };
            runtime.block_on(simulate(SimulateArgs {
                readings,
                interval,
                max_rate,
                defaults,
                record,
                events,
            }))
        }
        SessionAction::History { limit } => {
            let records = Database::open()?.recent_sessions(limit)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }
    }
}

struct SimulateArgs {
    readings: Vec<u32>,
    interval: Duration,
    max_rate: Option<u32>,
    defaults: bool,
    record: bool,
    events: bool,
}

async fn simulate(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let max_rate = args
        .max_rate
        .unwrap_or_else(|| config.profile.max_rate(Local::now().date_naive()));

    let settings = if args.defaults {
        SettingsSynchronizer::load(Box::new(MemoryStore::new()), ephemeral_device_id())
    } else {
        SettingsSynchronizer::load(Box::new(Database::open()?), ephemeral_device_id())
    };

    let source = Arc::new(ScriptedSource::from_readings(&args.readings, args.interval));
    let log = Arc::new(EventLog::new());
    let mut controller = SessionController::new(
        source.clone(),
        Arc::new(settings),
        Arc::new(AlertPlayer::new(Arc::new(LoggingDispatcher))),
    )
    .with_tick_interval(args.interval)
    .with_max_rate(max_rate)
    .with_observer(Arc::new(TracingObserver))
    .with_observer(log.clone());
    if args.record {
        controller = controller.with_observer(Arc::new(HistoryRecorder::new(Database::open()?)));
    }

    source.begin_at(tokio::time::Instant::now());
    controller.start().await?;
    let ticks = u32::try_from(args.readings.len()).unwrap_or(u32::MAX);
    tokio::time::sleep(args.interval * ticks + args.interval / 2).await;
    let summary = controller.stop().await.ok_or("session did not run")?;

    if args.events {
        for event in log.events() {
            if let Event::TickRecorded { .. } | Event::TickSkipped { .. } = event {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
    }

    let out = json!({
        "max_rate": max_rate,
        "in_zone_ms": summary.in_zone.as_millis() as u64,
        "out_of_zone_ms": summary.out_of_zone.as_millis() as u64,
        "total_ms": summary.total.as_millis() as u64,
        "in_zone_ratio": summary.in_zone_ratio,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
