//! Interval timer engine.
//!
//! The timer engine is a wall-clock-based state machine. It does not use
//! internal threads - it arms its [`Ticker`](crate::ticker::Ticker) while
//! running and the driver calls `tick()` at that cadence.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> (Completed | Finished) -> reset -> Idle
//! ```
//!
//! Remaining time is recomputed on every tick from the rep's start stamp,
//! net of pauses, so a late tick never shortens or stretches a rep.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(Schedule::standard(), WorkoutMode::Standard, collaborators);
//! engine.start();
//! // While the ticker is armed:
//! engine.tick(); // Returns Some(Event) on rep/level rollover and completion
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::elapsed::ElapsedWindow;
use super::schedule::{LevelSpec, Schedule};
use crate::audio::Cue;
use crate::collaborators::Collaborators;
use crate::events::Event;
use crate::models::{NewWorkoutSession, WorkoutMode};

/// Default ticker cadence (about 30 updates per second).
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(33);

/// Observable run state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerRunState {
    pub current_level: u32,
    pub current_rep: u32,
    pub total_reps_completed: u32,
    pub is_running: bool,
    pub is_paused: bool,
    pub time_remaining_secs: f64,
    /// Set on the first `start()` only; anchors duration reporting.
    pub workout_started_at_ms: Option<u64>,
    /// Elapsed-time window of the current rep. Restarted on every rollover.
    #[serde(flatten)]
    rep_window: ElapsedWindow,
}

impl TimerRunState {
    fn initial(schedule: &Schedule) -> Self {
        Self {
            current_level: 1,
            current_rep: 1,
            total_reps_completed: 0,
            is_running: false,
            is_paused: false,
            time_remaining_secs: first_interval(schedule),
            workout_started_at_ms: None,
            rep_window: ElapsedWindow::new(),
        }
    }

    pub fn current_rep_started_at_ms(&self) -> Option<u64> {
        self.rep_window.started_at_ms()
    }

    /// Pause time inside the current rep only.
    pub fn accumulated_pause_ms(&self) -> u64 {
        self.rep_window.accumulated_pause_ms()
    }

    /// True while nothing has happened since construction or reset.
    pub fn is_idle(&self) -> bool {
        !self.is_running
            && self.workout_started_at_ms.is_none()
            && self.current_level == 1
            && self.current_rep == 1
            && self.total_reps_completed == 0
    }
}

/// End-of-run figures shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub mode: WorkoutMode,
    pub max_level: u32,
    pub total_reps: u32,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, Copy)]
struct FinishPrompt {
    was_paused: bool,
}

/// Core interval timer engine.
pub struct TimerEngine {
    schedule: Schedule,
    mode: WorkoutMode,
    notes: String,
    state: TimerRunState,
    session_id: Option<i64>,
    /// Set once the run ended (completion or confirmed early finish).
    finished: bool,
    /// Clock reading when the run ended; freezes reported durations.
    ended_at_ms: Option<u64>,
    finish_prompt: Option<FinishPrompt>,
    tick_interval: Duration,
    collab: Collaborators,
    on_complete: Option<Box<dyn FnMut(i64)>>,
}

impl TimerEngine {
    /// Create a new timer engine with the given schedule.
    ///
    /// Starts idle at level 1, rep 1 with the first level's interval ready.
    pub fn new(schedule: Schedule, mode: WorkoutMode, collab: Collaborators) -> Self {
        let state = TimerRunState::initial(&schedule);
        Self {
            schedule,
            mode,
            notes: String::new(),
            state,
            session_id: None,
            finished: false,
            ended_at_ms: None,
            finish_prompt: None,
            tick_interval: DEFAULT_TICK_INTERVAL,
            collab,
            on_complete: None,
        }
    }

    /// Notes attached to the saved session.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Called with the saved session id when a run ends and was persisted.
    pub fn on_complete(mut self, callback: impl FnMut(i64) + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerRunState {
        &self.state
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn mode(&self) -> WorkoutMode {
        self.mode
    }

    pub fn session_id(&self) -> Option<i64> {
        self.session_id
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// True while a finish-early confirmation is outstanding.
    pub fn is_awaiting_finish(&self) -> bool {
        self.finish_prompt.is_some()
    }

    pub fn current_level_spec(&self) -> Option<&LevelSpec> {
        self.schedule.level(self.state.current_level)
    }

    /// 0.0 .. 1.0 progress within the current rep.
    pub fn level_progress(&self) -> f64 {
        match self.current_level_spec() {
            Some(spec) if !self.finished => {
                (1.0 - self.state.time_remaining_secs / spec.interval_secs).clamp(0.0, 1.0)
            }
            Some(_) => 1.0,
            None => 0.0,
        }
    }

    /// 0.0 .. 100.0 progress across the whole schedule, by reps.
    pub fn workout_progress_pct(&self) -> f64 {
        let total = self.schedule.total_reps();
        if total == 0 {
            return 0.0;
        }
        let done = if self.finished {
            self.state.total_reps_completed as f64
        } else {
            let before_level = self
                .schedule
                .cumulative_reps_through_level(i64::from(self.state.current_level) - 1);
            (before_level + self.state.current_rep - 1) as f64 + self.level_progress()
        };
        (done / total as f64 * 100.0).min(100.0)
    }

    pub fn summary(&self) -> WorkoutSummary {
        WorkoutSummary {
            mode: self.mode,
            max_level: self.state.current_level,
            total_reps: self.state.total_reps_completed,
            elapsed_secs: self.elapsed_ms() as f64 / 1000.0,
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            mode: self.mode,
            state: self.state.clone(),
            level_progress: self.level_progress(),
            workout_progress_pct: self.workout_progress_pct(),
            session_id: self.session_id,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        if self.state.is_running || self.finished {
            return None;
        }
        if let Err(e) = self.collab.audio.initialize() {
            tracing::warn!("audio unavailable, continuing without cues: {e}");
        }
        self.collab.audio.play(Cue::Start);

        let now = self.collab.clock.now_ms();
        let first_start = self.state.workout_started_at_ms.is_none();
        if first_start {
            self.state.workout_started_at_ms = Some(now);
        }
        self.state.is_running = true;
        self.state.is_paused = false;
        self.state.rep_window.start(now);
        self.collab.ticker.arm(self.tick_interval);

        tracing::debug!(level = self.state.current_level, rep = self.state.current_rep, "timer started");
        Some(Event::TimerStarted {
            level: self.state.current_level,
            rep: self.state.current_rep,
            interval_secs: self.current_level_spec().map(|s| s.interval_secs).unwrap_or(0.0),
            first_start,
        })
    }

    /// Toggle between paused and running. No-op unless a run is active.
    pub fn pause(&mut self) -> Option<Event> {
        if !self.state.is_running {
            return None;
        }
        let now = self.collab.clock.now_ms();
        if self.state.is_paused {
            Some(self.resume_at(now))
        } else {
            self.pause_at(now);
            Some(Event::TimerPaused {
                level: self.state.current_level,
                rep: self.state.current_rep,
                remaining_secs: self.state.time_remaining_secs,
            })
        }
    }

    /// Call periodically while the ticker is armed.
    ///
    /// Returns an event when a rep or level rolls over or the run completes.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.state.is_running || self.state.is_paused {
            return None;
        }
        let spec = *self.current_level_spec()?;
        if !self.state.rep_window.is_started() {
            return None;
        }

        let now = self.collab.clock.now_ms();
        let elapsed_secs = self.state.rep_window.elapsed_secs(now);
        self.state.time_remaining_secs = (spec.interval_secs - elapsed_secs).max(0.0);
        if self.state.time_remaining_secs > 0.0 {
            return None;
        }

        if self.state.current_rep < spec.reps {
            Some(self.advance_rep(now, &spec))
        } else if let Some(next) = self.schedule.level(self.state.current_level + 1).copied() {
            Some(self.advance_level(now, &next))
        } else {
            Some(self.complete())
        }
    }

    /// Freeze the run while the user decides whether to finish early.
    ///
    /// Follow with [`confirm_finish`](Self::confirm_finish) or
    /// [`cancel_finish`](Self::cancel_finish).
    pub fn finish_early(&mut self) -> Option<Event> {
        if !self.state.is_running || self.finish_prompt.is_some() {
            return None;
        }
        let was_paused = self.state.is_paused;
        if !was_paused {
            let now = self.collab.clock.now_ms();
            self.pause_at(now);
        }
        self.finish_prompt = Some(FinishPrompt { was_paused });
        Some(Event::FinishRequested {
            level: self.state.current_level,
            total_reps: self.state.total_reps_completed,
        })
    }

    /// Dismiss the finish prompt. Resumes only if `finish_early` paused.
    pub fn cancel_finish(&mut self) -> Option<Event> {
        let prompt = self.finish_prompt.take()?;
        let resumed = !prompt.was_paused && self.state.is_paused;
        if resumed {
            let now = self.collab.clock.now_ms();
            self.resume_at(now);
        }
        Some(Event::FinishCancelled { resumed })
    }

    /// End the run now. The in-progress rep does not count.
    pub fn confirm_finish(&mut self) -> Option<Event> {
        self.finish_prompt.take()?;
        self.stop();
        let session_id = self.persist_session();
        tracing::debug!(level = self.state.current_level, reps = self.state.total_reps_completed, "workout finished early");
        Some(Event::WorkoutFinished {
            session_id,
            max_level: self.state.current_level,
            total_reps: self.state.total_reps_completed,
            duration_minutes: self.duration_minutes(),
        })
    }

    pub fn reset(&mut self) -> Option<Event> {
        self.collab.ticker.disarm();
        self.state = TimerRunState::initial(&self.schedule);
        self.session_id = None;
        self.finished = false;
        self.ended_at_ms = None;
        self.finish_prompt = None;
        Some(Event::TimerReset)
    }

    /// Swap in a new schedule, e.g. after a fresh calibration.
    ///
    /// Only allowed while idle; a run in progress keeps its schedule.
    pub fn set_schedule(&mut self, schedule: Schedule) -> Option<Event> {
        if !self.state.is_idle() {
            tracing::warn!("ignoring schedule change during a run");
            return None;
        }
        self.schedule = schedule;
        self.state.time_remaining_secs = first_interval(&self.schedule);
        Some(Event::ScheduleChanged {
            levels: self.schedule.len(),
            remaining_secs: self.state.time_remaining_secs,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn pause_at(&mut self, now: u64) {
        self.state.is_paused = true;
        self.state.rep_window.begin_pause(now);
        self.collab.ticker.disarm();
    }

    fn resume_at(&mut self, now: u64) -> Event {
        let pause_ms = self.state.rep_window.end_pause(now);
        self.state.is_paused = false;
        self.collab.ticker.arm(self.tick_interval);
        Event::TimerResumed {
            pause_ms,
            remaining_secs: self.state.time_remaining_secs,
        }
    }

    fn advance_rep(&mut self, now: u64, spec: &LevelSpec) -> Event {
        self.state.current_rep += 1;
        self.state.total_reps_completed += 1;
        self.state.rep_window.start(now);
        self.state.time_remaining_secs = spec.interval_secs;
        self.collab.audio.play(Cue::Beep);
        tracing::debug!(level = spec.level, rep = self.state.current_rep, "rep advanced");
        Event::RepAdvanced {
            level: self.state.current_level,
            rep: self.state.current_rep,
            total_reps: self.state.total_reps_completed,
        }
    }

    fn advance_level(&mut self, now: u64, next: &LevelSpec) -> Event {
        self.state.current_level = next.level;
        self.state.current_rep = 1;
        self.state.total_reps_completed += 1;
        self.state.rep_window.start(now);
        self.state.time_remaining_secs = next.interval_secs;
        self.collab.audio.play(Cue::LevelUp);
        tracing::debug!(level = next.level, interval = next.interval_secs, "level advanced");
        Event::LevelAdvanced {
            level: next.level,
            interval_secs: next.interval_secs,
            total_reps: self.state.total_reps_completed,
        }
    }

    fn complete(&mut self) -> Event {
        self.state.total_reps_completed += 1;
        self.stop();
        self.state.time_remaining_secs = 0.0;
        self.collab.audio.play(Cue::Complete);
        let session_id = self.persist_session();
        Event::WorkoutCompleted {
            session_id,
            max_level: self.state.current_level,
            total_reps: self.state.total_reps_completed,
            duration_minutes: self.duration_minutes(),
        }
    }

    fn stop(&mut self) {
        self.collab.ticker.disarm();
        self.state.is_running = false;
        self.state.is_paused = false;
        self.finished = true;
        self.ended_at_ms = Some(self.collab.clock.now_ms());
    }

    /// Wall time since the first start, up to the end of the run.
    fn elapsed_ms(&self) -> u64 {
        let Some(start) = self.state.workout_started_at_ms else {
            return 0;
        };
        let end = self.ended_at_ms.unwrap_or_else(|| self.collab.clock.now_ms());
        end.saturating_sub(start)
    }

    fn duration_minutes(&self) -> u32 {
        (self.elapsed_ms() as f64 / 60_000.0).round() as u32
    }

    /// Save the session and fire the completion callback. Storage failures
    /// are logged; the run still counts as ended.
    fn persist_session(&mut self) -> Option<i64> {
        self.state.workout_started_at_ms?;
        let session = NewWorkoutSession {
            date: self.collab.clock.today(),
            mode: self.mode,
            max_level: self.state.current_level,
            total_reps: self.state.total_reps_completed,
            duration_minutes: self.duration_minutes(),
            notes: Some(self.notes.clone()).filter(|n| !n.is_empty()),
        };
        match self.collab.store.save_workout(&session) {
            Ok(id) => {
                tracing::info!(id, level = session.max_level, reps = session.total_reps, "workout saved");
                self.session_id = Some(id);
                if let Some(callback) = self.on_complete.as_mut() {
                    callback(id);
                }
                Some(id)
            }
            Err(e) => {
                tracing::warn!("failed to save workout: {e}");
                None
            }
        }
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.collab.ticker.disarm();
    }
}

fn first_interval(schedule: &Schedule) -> f64 {
    schedule.first().map(|s| s.interval_secs).unwrap_or(0.0)
}
