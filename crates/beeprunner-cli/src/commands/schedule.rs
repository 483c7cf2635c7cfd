use clap::Args;
use beeprunner_core::{Config, Database, Schedule, WorkoutMode};

use super::{schedule_for, CliResult};

#[derive(Args)]
pub struct ScheduleArgs {
    /// Workout mode (defaults to workout.default_mode)
    #[arg(long)]
    mode: Option<WorkoutMode>,
    /// Derive from this measured time instead of the stored calibration
    #[arg(long, value_name = "SECS")]
    measured: Option<f64>,
    /// Print JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: ScheduleArgs) -> CliResult {
    let schedule = match (args.measured, args.mode) {
        (Some(secs), _) => Schedule::from_calibration(secs)?,
        (None, Some(WorkoutMode::Standard)) => Schedule::standard(),
        (None, mode) => {
            let mode = match mode {
                Some(mode) => mode,
                None => Config::load()?.workout.default_mode,
            };
            schedule_for(&Database::open()?, mode)?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&schedule)?);
        return Ok(());
    }

    println!("{:>5}  {:>4}  {:>8}  {:>10}", "Level", "Reps", "Interval", "Cumulative");
    for spec in schedule.levels() {
        println!(
            "{:>5}  {:>4}  {:>7.2}s  {:>10}",
            spec.level,
            spec.reps,
            spec.interval_secs,
            schedule.cumulative_reps_through_level(i64::from(spec.level)),
        );
    }
    println!(
        "{} reps, {:.1} min",
        schedule.total_reps(),
        schedule.total_duration_secs() / 60.0
    );
    Ok(())
}
