use chrono::NaiveDate;
use clap::Subcommand;
use beeprunner_core::{Config, Database, HistoryPager, HistorySummary, WorkoutMode, WorkoutSession, WorkoutStore};

use super::CliResult;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List recent workouts, newest first
    List {
        #[arg(long)]
        mode: Option<WorkoutMode>,
        /// Number of workouts (defaults to history.page_size)
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        json: bool,
    },
    /// Workouts between two dates, inclusive
    Range {
        /// Start date (YYYY-MM-DD)
        from: NaiveDate,
        /// End date (YYYY-MM-DD)
        to: NaiveDate,
        #[arg(long)]
        json: bool,
    },
    /// Best workout for a mode
    Best {
        #[arg(long)]
        mode: WorkoutMode,
        #[arg(long)]
        json: bool,
    },
    /// Delete a workout and its feedback
    Delete { id: i64 },
    /// Totals, per-day counts and level trend
    Summary {
        #[arg(long)]
        mode: Option<WorkoutMode>,
        #[arg(long)]
        json: bool,
    },
}

fn print_sessions(sessions: &[WorkoutSession], json: bool) -> CliResult {
    if json {
        println!("{}", serde_json::to_string_pretty(sessions)?);
        return Ok(());
    }
    if sessions.is_empty() {
        println!("no workouts");
        return Ok(());
    }
    for s in sessions {
        println!(
            "#{:<5} {}  {:<8}  level {:>2}  {:>3} reps  {:>3} min{}",
            s.id,
            s.date,
            s.mode,
            s.max_level,
            s.total_reps,
            s.duration_minutes,
            s.notes.as_deref().map(|n| format!("  {n}")).unwrap_or_default(),
        );
    }
    Ok(())
}

pub fn run(action: HistoryAction) -> CliResult {
    let db = Database::open()?;
    match action {
        HistoryAction::List { mode, limit, json } => {
            let page_size = match limit {
                Some(limit) => limit,
                None => Config::load()?.history.page_size,
            };
            let mut pager = HistoryPager::new(mode, page_size);
            pager.refresh(&db)?;
            print_sessions(pager.sessions(), json)?;
            if pager.has_more() && !json {
                println!("(more available; raise --limit)");
            }
        }
        HistoryAction::Range { from, to, json } => {
            if from > to {
                return Err(format!("start date {from} is after end date {to}").into());
            }
            print_sessions(&db.workouts_by_date_range(from, to)?, json)?;
        }
        HistoryAction::Best { mode, json } => match db.personal_best(mode)? {
            Some(best) => print_sessions(std::slice::from_ref(&best), json)?,
            None if json => println!("null"),
            None => println!("no {mode} workouts yet"),
        },
        HistoryAction::Delete { id } => {
            db.delete_workout(id)?;
            println!("deleted workout #{id}");
        }
        HistoryAction::Summary { mode, json } => {
            let page_size = Config::load()?.history.page_size;
            let mut pager = HistoryPager::new(mode, page_size);
            pager.refresh(&db)?;
            while pager.load_more(&db)? {}
            let summary = HistorySummary::from_sessions(pager.sessions());
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
                return Ok(());
            }
            println!("workouts: {}", summary.total_workouts);
            println!("reps:     {}", summary.total_reps);
            println!("minutes:  {}", summary.total_minutes);
            if let (Some(best), Some(avg)) = (summary.best_level, summary.average_level) {
                println!("best level {best}, average {avg:.1}");
            }
            if !summary.level_trend.is_empty() {
                let trend: Vec<String> = summary
                    .level_trend
                    .iter()
                    .map(|p| p.max_level.to_string())
                    .collect();
                println!("trend:    {}", trend.join(" "));
            }
            println!("active days: {}", summary.per_day.len());
        }
    }
    Ok(())
}
