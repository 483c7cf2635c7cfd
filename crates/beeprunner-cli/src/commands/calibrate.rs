use std::io::Write;
use std::rc::Rc;

use clap::Args;
use beeprunner_core::timer::REFERENCE_DISTANCE_M;
use beeprunner_core::{CalibrationEngine, CalibrationPhase, Config, Database, Event, ManualTicker};

use super::CliResult;
use crate::terminal::{self, TickSource};

#[derive(Args)]
pub struct CalibrateArgs {
    /// Keep the most recent stored calibration instead of measuring
    #[arg(long)]
    reuse: bool,
}

pub fn run(args: CalibrateArgs) -> CliResult {
    let config = Config::load()?;
    let db = Rc::new(Database::open()?);
    let (collab, ticker) = terminal::live_collaborators(db, &config.audio);
    let mut engine = CalibrationEngine::with_config(collab, config.calibration.clone());

    if args.reuse {
        let m = engine.load_previous()?;
        println!(
            "using stored calibration: {:.2}s ({:.1} m)",
            m.measured_time_secs, m.estimated_distance_m
        );
    } else {
        if let Some(prev) = engine.previous() {
            println!(
                "previous calibration: {:.2}s on {} (use --reuse to keep it)",
                prev.measurement.measured_time_secs,
                prev.created_at.format("%Y-%m-%d"),
            );
        }
        println!("run {REFERENCE_DISTANCE_M} m after GO and press Enter at the line");
        terminal::runtime()?.block_on(drive(&mut engine, ticker))?;
    }

    if engine.phase() == CalibrationPhase::Idle {
        return Ok(());
    }
    let schedule = engine.personal_schedule()?;
    println!(
        "personal schedule: level 1 at {}, level {} at {}",
        terminal::format_secs(schedule.first().map(|l| l.interval_secs).unwrap_or(0.0)),
        schedule.max_level(),
        terminal::format_secs(
            schedule
                .level(schedule.max_level())
                .map(|l| l.interval_secs)
                .unwrap_or(0.0)
        ),
    );
    Ok(())
}

async fn drive(engine: &mut CalibrationEngine, ticker: Rc<ManualTicker>) -> std::io::Result<()> {
    let mut ticks = TickSource::new(ticker);
    let mut lines = terminal::stdin_lines();

    let event = engine.begin();
    render(engine, event);

    while engine.phase() != CalibrationPhase::ResultsReady {
        tokio::select! {
            _ = ticks.next() => {
                let event = engine.tick();
                render(engine, event);
            }
            line = lines.next_line() => match line? {
                Some(_) => {
                    let event = engine.stop_measuring();
                    render(engine, event);
                }
                None => {
                    engine.reset();
                    terminal::end_status();
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "input closed before the measurement was stopped",
                    ));
                }
            },
        }
    }

    print!("save this calibration? [Y/n] ");
    std::io::stdout().flush()?;
    let answer = lines.next_line().await?.unwrap_or_default();
    if answer.trim().eq_ignore_ascii_case("n") {
        engine.discard_and_restart();
        println!("discarded");
    } else if engine.confirm() {
        println!("saved");
    } else {
        println!("could not save; using it for this session only");
    }
    Ok(())
}

fn render(engine: &CalibrationEngine, event: Option<Event>) {
    match event {
        Some(Event::CountdownStarted { from: n }) | Some(Event::CountdownTick { remaining: n }) => {
            terminal::status(&format!("{n}..."));
        }
        Some(Event::MeasurementStarted) => {
            terminal::end_status();
            println!("GO!");
        }
        Some(Event::MeasurementStopped { measured_time_secs, estimated_distance_m }) => {
            terminal::end_status();
            println!(
                "time {}, estimated distance {estimated_distance_m:.1} m",
                terminal::format_secs(measured_time_secs)
            );
        }
        _ if engine.phase() == CalibrationPhase::Measuring => {
            terminal::status(&terminal::format_secs(engine.elapsed_secs()));
        }
        _ => {}
    }
}
