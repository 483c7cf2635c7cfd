//! # BeepRunner Core Library
//!
//! Core logic for a progressive shuttle-run ("beep test") trainer. The
//! `beeprunner` CLI is a thin driver over this crate.
//!
//! ## Architecture
//!
//! - **Schedules**: the fixed 9-level reference protocol, and personal
//!   schedules scaled from a calibration run
//! - **Calibration Engine**: countdown plus stopwatch that measures the
//!   user's time over the reference distance
//! - **Timer Engine**: a wall-clock-based state machine that walks a
//!   schedule rep by rep; the caller drives it with `tick()`
//! - **Storage**: SQLite-based session storage and TOML-based configuration
//!
//! Engines receive their audio, storage, clock and ticker through
//! [`Collaborators`], so they can run against fakes in tests.
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Interval timer state machine
//! - [`CalibrationEngine`]: Calibration state machine
//! - [`Schedule`]: Validated level table
//! - [`Database`]: Calibration and workout persistence
//! - [`Config`]: Application configuration management

pub mod audio;
pub mod calibration;
pub mod clock;
pub mod collaborators;
pub mod error;
pub mod events;
pub mod feedback;
pub mod history;
pub mod models;
pub mod storage;
pub mod ticker;
pub mod timer;

pub use audio::{AudioCues, Cue, RecordingAudio, SilentAudio, Tone};
pub use calibration::{CalibrationEngine, CalibrationPhase};
pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::Collaborators;
pub use error::{AudioError, CalibrationError, ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use feedback::{apply_feedback, FeedbackOutcome};
pub use history::{HistoryPager, HistorySummary};
pub use models::{
    CalibrationMeasurement, CalibrationRecord, CalibrationSuggestion, NewWorkoutSession,
    SuggestionAction, WorkoutMode, WorkoutSession,
};
pub use storage::{Config, Database, WorkoutStore};
pub use ticker::{ManualTicker, Ticker};
pub use timer::{FeedbackKind, LevelSpec, Schedule, TimerEngine, TimerRunState, WorkoutSummary};
