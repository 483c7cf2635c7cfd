use clap::Args;
use beeprunner_core::{apply_feedback, Database, FeedbackKind, Schedule, WorkoutStore};

use super::CliResult;

#[derive(Args)]
pub struct FeedbackArgs {
    /// Workout session id (printed at the end of `beeprunner run`)
    session_id: i64,
    /// too-easy, perfect or too-hard
    kind: FeedbackKind,
    /// Print JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: FeedbackArgs) -> CliResult {
    let db = Database::open()?;
    let current = db.latest_calibration()?.map(|r| r.measurement);
    let outcome = apply_feedback(&db, args.session_id, args.kind, current.as_ref())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome.adjusted {
        Some(adjusted) => {
            let next = Schedule::from_calibration(adjusted.measurement.measured_time_secs)?;
            println!(
                "feedback recorded; intervals x{:.2}, level 1 now {:.2}s",
                outcome.multiplier,
                next.first().map(|l| l.interval_secs).unwrap_or(0.0)
            );
        }
        None if current.is_none() => {
            println!("feedback recorded; no calibration to adjust");
        }
        None => println!("feedback recorded; schedule unchanged"),
    }
    Ok(())
}
