mod elapsed;
mod engine;
mod schedule;

pub use elapsed::ElapsedWindow;
pub use engine::{TimerEngine, TimerRunState, WorkoutSummary, DEFAULT_TICK_INTERVAL};
pub use schedule::{
    estimated_distance_m, FeedbackKind, LevelSpec, Schedule, REFERENCE_DISTANCE_M,
    REFERENCE_TIME_SECS,
};
