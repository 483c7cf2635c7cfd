//! E2E tests for the calibrate -> train -> feedback loop.
//!
//! Engines run against a file-backed database, a manual clock and manual
//! tickers, so every scenario is deterministic.

use std::cell::RefCell;
use std::rc::Rc;

use beeprunner_core::{
    apply_feedback, CalibrationEngine, CalibrationPhase, Collaborators, Cue, Database, Event,
    FeedbackKind, HistoryPager, HistorySummary, ManualClock, ManualTicker, RecordingAudio,
    Schedule, Ticker, TimerEngine, WorkoutMode, WorkoutStore,
};
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

const STEP_MS: u64 = 10;

struct Rig {
    _dir: TempDir,
    db: Rc<Database>,
    clock: Rc<ManualClock>,
    audio: Rc<RecordingAudio>,
    base: Collaborators,
}

impl Rig {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Rc::new(Database::open_at(&dir.path().join("beeprunner.db")).unwrap());
        let clock = Rc::new(ManualClock::new(1_717_200_000_000));
        let audio = Rc::new(RecordingAudio::new());
        let base = Collaborators::new(
            audio.clone(),
            db.clone(),
            clock.clone(),
            Rc::new(ManualTicker::new()),
        );
        Self {
            _dir: dir,
            db,
            clock,
            audio,
            base,
        }
    }

    /// Fresh collaborators with their own ticker.
    fn collab(&self) -> (Collaborators, Rc<ManualTicker>) {
        let ticker = Rc::new(ManualTicker::new());
        (self.base.with_ticker(ticker.clone()), ticker)
    }

    fn calibrate(&self, measured_ms: u64) -> CalibrationEngine {
        let (collab, ticker) = self.collab();
        let mut engine = CalibrationEngine::new(collab);
        engine.begin();
        while engine.phase() == CalibrationPhase::CountingDown {
            self.clock.advance(1_000);
            engine.tick();
        }
        for _ in 0..measured_ms / 20 {
            self.clock.advance(20);
            if ticker.is_armed() {
                engine.tick();
            }
        }
        engine.stop_measuring();
        engine
    }

    fn drive(&self, engine: &mut TimerEngine, ticker: &ManualTicker, ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        for _ in 0..ms / STEP_MS {
            self.clock.advance(STEP_MS);
            if ticker.is_armed() {
                events.extend(engine.tick());
            }
        }
        events
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn calibrated_personal_run_is_saved_and_rated() {
    let rig = Rig::new();

    let mut calibration = rig.calibrate(4_500);
    assert!(calibration.confirm());
    let schedule = calibration.personal_schedule().unwrap();
    assert!((schedule.first().unwrap().interval_secs - 4.5).abs() < 1e-9);
    drop(calibration);

    let (collab, ticker) = rig.collab();
    let completed = Rc::new(RefCell::new(None));
    let sink = completed.clone();
    let mut timer = TimerEngine::new(schedule.clone(), WorkoutMode::Personal, collab)
        .on_complete(move |id| *sink.borrow_mut() = Some(id));
    timer.start();

    // Levels 1 and 2 in full: 7 x 4.5s + 8 x 4.0s.
    rig.drive(&mut timer, &ticker, 63_500);
    assert_eq!(timer.state().current_level, 3);
    assert_eq!(timer.state().total_reps_completed, 15);

    rig.drive(&mut timer, &ticker, 1_000);
    timer.finish_early();
    let event = timer.confirm_finish().unwrap();
    let Event::WorkoutFinished { session_id, max_level, total_reps, duration_minutes } = event
    else {
        panic!("expected WorkoutFinished, got {event:?}");
    };
    assert_eq!((max_level, total_reps, duration_minutes), (3, 15, 1));
    assert_eq!(*completed.borrow(), session_id);

    let before = rig.db.latest_calibration().unwrap().unwrap();
    let outcome = apply_feedback(
        rig.db.as_ref(),
        session_id.unwrap(),
        FeedbackKind::TooEasy,
        Some(&before.measurement),
    )
    .unwrap();
    assert!(outcome.adjusted.is_some());

    // The next calibration engine sees the adjusted record.
    let (collab, _ticker) = rig.collab();
    let mut next = CalibrationEngine::new(collab);
    let adopted = next.load_previous().unwrap();
    let next_schedule = next.personal_schedule().unwrap();
    let expected = schedule.adjusted_for_feedback(FeedbackKind::TooEasy);
    assert!((adopted.measured_time_secs - 4.05).abs() < 1e-9);
    for (a, b) in next_schedule.levels().iter().zip(expected.levels()) {
        assert!((a.interval_secs - b.interval_secs).abs() < 1e-9);
    }
}

#[test]
fn three_level_run_fires_cues_in_order() {
    let rig = Rig::new();
    let schedule = Schedule::new(vec![
        beeprunner_core::LevelSpec { level: 1, reps: 3, interval_secs: 2.0 },
        beeprunner_core::LevelSpec { level: 2, reps: 3, interval_secs: 1.5 },
        beeprunner_core::LevelSpec { level: 3, reps: 3, interval_secs: 1.0 },
    ])
    .unwrap();
    let (collab, ticker) = rig.collab();
    let mut timer = TimerEngine::new(schedule, WorkoutMode::Standard, collab);
    timer.start();
    let events = rig.drive(&mut timer, &ticker, 20_000);

    assert_eq!(
        rig.audio.cues(),
        vec![
            Cue::Start,
            Cue::Beep,
            Cue::Beep,
            Cue::LevelUp,
            Cue::Beep,
            Cue::Beep,
            Cue::LevelUp,
            Cue::Beep,
            Cue::Beep,
            Cue::Complete,
        ]
    );
    let levels: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            Event::LevelAdvanced { level, .. } => Some(*level),
            _ => None,
        })
        .collect();
    assert_eq!(levels, vec![2, 3]);
    assert_eq!(timer.state().total_reps_completed, 9);

    let history = rig.db.workout_history(Some(WorkoutMode::Standard), 10).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].total_reps, 9);
}

#[test]
fn pause_does_not_shift_rollover() {
    let rig = Rig::new();
    let (collab, ticker) = rig.collab();
    let mut timer = TimerEngine::new(Schedule::standard(), WorkoutMode::Standard, collab);
    timer.start();

    rig.drive(&mut timer, &ticker, 3_000);
    timer.pause();
    rig.clock.advance(60_000);
    timer.pause();

    rig.drive(&mut timer, &ticker, 5_990);
    assert_eq!(timer.state().current_rep, 1);
    rig.drive(&mut timer, &ticker, 10);
    assert_eq!(timer.state().current_rep, 2);
}

#[test]
fn history_pages_through_saved_runs() {
    let rig = Rig::new();
    for _ in 0..5 {
        let (collab, ticker) = rig.collab();
        let mut timer = TimerEngine::new(Schedule::standard(), WorkoutMode::Standard, collab);
        timer.start();
        rig.drive(&mut timer, &ticker, 18_000);
        timer.finish_early();
        timer.confirm_finish();
    }

    let mut pager = HistoryPager::new(Some(WorkoutMode::Standard), 2);
    pager.refresh(rig.db.as_ref()).unwrap();
    while pager.load_more(rig.db.as_ref()).unwrap() {}
    assert_eq!(pager.sessions().len(), 5);
    assert!(!pager.has_more());

    let summary = HistorySummary::from_sessions(pager.sessions());
    assert_eq!(summary.total_reps, 10);
    assert_eq!(summary.best_level, Some(1));
    assert_eq!(summary.per_day.len(), 1);

    let best = rig.db.personal_best(WorkoutMode::Standard).unwrap().unwrap();
    rig.db.delete_workout(best.id).unwrap();
    assert_eq!(rig.db.workout_history(None, 50).unwrap().len(), 4);
}

#[test]
fn reopened_database_keeps_calibration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("beeprunner.db");
    {
        let db = Database::open_at(&path).unwrap();
        db.save_calibration(&beeprunner_core::CalibrationMeasurement::from_measured_time(9.0))
            .unwrap();
    }
    let db = Database::open_at(&path).unwrap();
    let latest = db.latest_calibration().unwrap().unwrap();
    assert_eq!(latest.measurement.measured_time_secs, 9.0);
    assert!((latest.measurement.estimated_distance_m - 20.0).abs() < 1e-9);
}
