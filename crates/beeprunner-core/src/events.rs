use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationPhase;
use crate::models::WorkoutMode;
use crate::timer::TimerRunState;

/// Every engine state change produces an Event.
/// Front ends render from these; `StateSnapshot` carries the full picture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    // ── Interval timer ───────────────────────────────────────────────
    TimerStarted {
        level: u32,
        rep: u32,
        interval_secs: f64,
        /// False when continuing a run that was started before.
        first_start: bool,
    },
    TimerPaused {
        level: u32,
        rep: u32,
        remaining_secs: f64,
    },
    TimerResumed {
        pause_ms: u64,
        remaining_secs: f64,
    },
    RepAdvanced {
        level: u32,
        rep: u32,
        total_reps: u32,
    },
    LevelAdvanced {
        level: u32,
        interval_secs: f64,
        total_reps: u32,
    },
    /// The final rep of the final level ran out.
    WorkoutCompleted {
        session_id: Option<i64>,
        max_level: u32,
        total_reps: u32,
        duration_minutes: u32,
    },
    /// The run is frozen awaiting a confirm/cancel decision.
    FinishRequested {
        level: u32,
        total_reps: u32,
    },
    FinishCancelled {
        resumed: bool,
    },
    /// The user ended the run before the schedule was exhausted.
    WorkoutFinished {
        session_id: Option<i64>,
        max_level: u32,
        total_reps: u32,
        duration_minutes: u32,
    },
    TimerReset,
    ScheduleChanged {
        levels: usize,
        remaining_secs: f64,
    },
    StateSnapshot {
        mode: WorkoutMode,
        state: TimerRunState,
        level_progress: f64,
        workout_progress_pct: f64,
        session_id: Option<i64>,
    },

    // ── Calibration ──────────────────────────────────────────────────
    CountdownStarted {
        from: u32,
    },
    CountdownTick {
        remaining: u32,
    },
    MeasurementStarted,
    MeasurementStopped {
        measured_time_secs: f64,
        estimated_distance_m: f64,
    },
    CalibrationSaved {
        id: i64,
    },
    CalibrationLoaded {
        measured_time_secs: f64,
        estimated_distance_m: f64,
    },
    CalibrationReset,
    CalibrationSnapshot {
        phase: CalibrationPhase,
        countdown: u32,
        elapsed_secs: f64,
        measured_time_secs: Option<f64>,
        estimated_distance_m: Option<f64>,
    },
}
