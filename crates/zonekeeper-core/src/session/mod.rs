//! Workout session: tick loop, classification, alerts.

mod alert;
mod controller;
mod engine;
mod observer;
mod sample;

pub use alert::{AlertDispatcher, AlertPlan, AlertPlayer, LoggingDispatcher, RecordingDispatcher};
pub use controller::{SessionController, DEFAULT_TICK_INTERVAL};
pub use engine::{Classification, SessionEngine, SessionPhase, SessionState, SessionSummary, TickOutcome};
pub use observer::{EventLog, HistoryRecorder, SessionObserver, TracingObserver};
pub use sample::{Authorization, ConstantSource, SampleSource, ScriptStep, ScriptedSource};
