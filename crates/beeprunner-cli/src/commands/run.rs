use std::cell::Cell;
use std::rc::Rc;

use clap::Args;
use beeprunner_core::{Config, Database, Event, ManualTicker, TimerEngine, WorkoutMode};

use super::{schedule_for, CliResult};
use crate::terminal::{self, TickSource};

#[derive(Args)]
pub struct RunArgs {
    /// Workout mode (defaults to workout.default_mode)
    #[arg(long)]
    mode: Option<WorkoutMode>,
    /// Notes saved with the session (defaults to workout.notes)
    #[arg(long)]
    notes: Option<String>,
}

pub fn run(args: RunArgs) -> CliResult {
    let config = Config::load()?;
    let mode = args.mode.unwrap_or(config.workout.default_mode);
    let db = Rc::new(Database::open()?);
    let schedule = schedule_for(&db, mode)?;
    let notes = args.notes.unwrap_or_else(|| config.workout.notes.clone());

    println!(
        "{mode} workout: {} levels, {} reps, level 1 at {}",
        schedule.len(),
        schedule.total_reps(),
        terminal::format_secs(schedule.first().map(|l| l.interval_secs).unwrap_or(0.0)),
    );
    println!("commands: p = pause/resume, f = finish early");

    let (collab, ticker) = terminal::live_collaborators(db, &config.audio);
    let saved = Rc::new(Cell::new(None));
    let sink = saved.clone();
    let mut engine = TimerEngine::new(schedule, mode, collab)
        .with_notes(notes)
        .with_tick_interval(config.timer.tick_interval())
        .on_complete(move |id| sink.set(Some(id)));

    terminal::runtime()?.block_on(drive(&mut engine, ticker))?;

    let summary = engine.summary();
    println!(
        "level {}, {} reps in {}",
        summary.max_level,
        summary.total_reps,
        terminal::format_secs(summary.elapsed_secs)
    );
    match saved.get() {
        Some(id) => {
            println!("saved as session #{id}");
            if mode == WorkoutMode::Personal {
                println!("rate it: beeprunner feedback {id} too-easy|perfect|too-hard");
            }
        }
        None if engine.is_finished() => println!("workout was not saved"),
        None => println!("workout abandoned"),
    }
    Ok(())
}

async fn drive(engine: &mut TimerEngine, ticker: Rc<ManualTicker>) -> std::io::Result<()> {
    let mut ticks = TickSource::new(ticker);
    let mut lines = terminal::stdin_lines();
    let mut stdin_open = true;

    let event = engine.start();
    render(engine, event);

    while !engine.is_finished() {
        if !stdin_open && !ticks.is_armed() {
            break;
        }
        tokio::select! {
            _ = ticks.next() => {
                let event = engine.tick();
                render(engine, event);
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => handle_input(engine, line.trim()),
                None => stdin_open = false,
            },
        }
    }
    terminal::end_status();
    Ok(())
}

fn handle_input(engine: &mut TimerEngine, input: &str) {
    let event = if engine.is_awaiting_finish() {
        if input.eq_ignore_ascii_case("y") {
            engine.confirm_finish()
        } else {
            engine.cancel_finish()
        }
    } else {
        match input {
            "p" => engine.pause(),
            "f" => engine.finish_early(),
            _ => {
                terminal::end_status();
                println!("commands: p = pause/resume, f = finish early");
                None
            }
        }
    };
    render(engine, event);
}

fn render(engine: &TimerEngine, event: Option<Event>) {
    match event {
        Some(Event::LevelAdvanced { level, interval_secs, .. }) => {
            terminal::end_status();
            println!("level {level}: {}", terminal::format_secs(interval_secs));
        }
        Some(Event::TimerPaused { .. }) => {
            terminal::end_status();
            println!("paused (p to resume)");
        }
        Some(Event::FinishRequested { level, total_reps }) => {
            terminal::end_status();
            println!("finish now at level {level} with {total_reps} reps? [y/N]");
        }
        Some(Event::WorkoutCompleted { .. }) => {
            terminal::end_status();
            println!("workout complete!");
        }
        Some(Event::WorkoutFinished { .. }) => {
            terminal::end_status();
            println!("workout finished early");
        }
        _ => {}
    }

    let state = engine.state();
    if state.is_running && !state.is_paused {
        let reps = engine.current_level_spec().map(|s| s.reps).unwrap_or(0);
        terminal::status(&format!(
            "level {} rep {}/{}  {}  {:.0}%",
            state.current_level,
            state.current_rep,
            reps,
            terminal::format_secs(state.time_remaining_secs),
            engine.workout_progress_pct(),
        ));
    }
}
