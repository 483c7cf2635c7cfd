pub mod calibrate;
pub mod config;
pub mod feedback;
pub mod history;
pub mod run;
pub mod schedule;
pub mod settings;

use beeprunner_core::{Database, Schedule, WorkoutMode, WorkoutStore};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Schedule for a workout mode; personal needs a stored calibration.
pub fn schedule_for(
    db: &Database,
    mode: WorkoutMode,
) -> Result<Schedule, Box<dyn std::error::Error>> {
    match mode {
        WorkoutMode::Standard => Ok(Schedule::standard()),
        WorkoutMode::Personal => {
            let record = db
                .latest_calibration()?
                .ok_or("no calibration found; run `beeprunner calibrate` first")?;
            Ok(Schedule::from_calibration(
                record.measurement.measured_time_secs,
            )?)
        }
    }
}
