//! Calibration engine.
//!
//! Measures how long the user takes to cover the reference distance. A
//! short countdown (one cue per second) precedes a stopwatch that runs
//! until `stop_measuring()`:
//!
//! ```text
//! Idle -> CountingDown -> Measuring -> ResultsReady -> Saved
//!   ^___________________ discard_and_restart / reset ______|
//! ```
//!
//! Like the timer engine, it arms its ticker while active and expects the
//! driver to call `tick()` at that cadence.

use serde::{Deserialize, Serialize};

use crate::audio::Cue;
use crate::collaborators::Collaborators;
use crate::error::{CalibrationError, DatabaseError};
use crate::events::Event;
use crate::models::{CalibrationMeasurement, CalibrationRecord};
use crate::storage::CalibrationConfig;
use crate::timer::{ElapsedWindow, Schedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationPhase {
    Idle,
    CountingDown,
    Measuring,
    ResultsReady,
    Saved,
}

pub struct CalibrationEngine {
    phase: CalibrationPhase,
    countdown: u32,
    stopwatch: ElapsedWindow,
    /// Last elapsed value shown while measuring; never decreases.
    elapsed_secs: f64,
    result: Option<CalibrationMeasurement>,
    saved_id: Option<i64>,
    previous: Option<CalibrationRecord>,
    config: CalibrationConfig,
    collab: Collaborators,
}

impl CalibrationEngine {
    /// Create an idle engine and look up the most recent stored calibration.
    pub fn new(collab: Collaborators) -> Self {
        Self::with_config(collab, CalibrationConfig::default())
    }

    pub fn with_config(collab: Collaborators, config: CalibrationConfig) -> Self {
        let mut engine = Self {
            phase: CalibrationPhase::Idle,
            countdown: config.countdown_from,
            stopwatch: ElapsedWindow::new(),
            elapsed_secs: 0.0,
            result: None,
            saved_id: None,
            previous: None,
            config,
            collab,
        };
        if let Err(e) = engine.refresh_previous() {
            tracing::warn!("failed to check existing calibration: {e}");
        }
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn countdown_value(&self) -> u32 {
        self.countdown
    }

    /// Stopwatch reading while measuring, or the final time afterwards.
    pub fn elapsed_secs(&self) -> f64 {
        match self.result {
            Some(m) => m.measured_time_secs,
            None => self.elapsed_secs,
        }
    }

    /// The active result: a fresh measurement or an adopted previous one.
    pub fn measurement(&self) -> Option<&CalibrationMeasurement> {
        self.result.as_ref()
    }

    /// Row id of the result once `confirm()` stored it.
    pub fn saved_id(&self) -> Option<i64> {
        self.saved_id
    }

    /// Stored calibration found at construction (or the last refresh).
    pub fn previous(&self) -> Option<&CalibrationRecord> {
        self.previous.as_ref()
    }

    /// Re-read the latest stored calibration.
    pub fn refresh_previous(&mut self) -> Result<Option<&CalibrationRecord>, DatabaseError> {
        self.previous = self.collab.store.latest_calibration()?;
        Ok(self.previous.as_ref())
    }

    /// Personal schedule derived from the active result.
    pub fn personal_schedule(&self) -> Result<Schedule, CalibrationError> {
        let measurement = self.result.ok_or(CalibrationError::NoMeasurement)?;
        Schedule::from_calibration(measurement.measured_time_secs)
    }

    pub fn snapshot(&self) -> Event {
        Event::CalibrationSnapshot {
            phase: self.phase,
            countdown: self.countdown,
            elapsed_secs: self.elapsed_secs(),
            measured_time_secs: self.result.map(|m| m.measured_time_secs),
            estimated_distance_m: self.result.map(|m| m.estimated_distance_m),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the countdown. Only valid from `Idle`.
    pub fn begin(&mut self) -> Option<Event> {
        if self.phase != CalibrationPhase::Idle {
            return None;
        }
        if let Err(e) = self.collab.audio.initialize() {
            tracing::warn!("audio unavailable, calibrating without cues: {e}");
        }
        self.clear_transient();
        self.phase = CalibrationPhase::CountingDown;
        self.collab.ticker.arm(self.config.countdown_interval());
        tracing::debug!(from = self.countdown, "calibration countdown started");
        Some(Event::CountdownStarted {
            from: self.countdown,
        })
    }

    /// Call periodically while the ticker is armed.
    pub fn tick(&mut self) -> Option<Event> {
        match self.phase {
            CalibrationPhase::CountingDown if self.countdown > 1 => {
                self.countdown -= 1;
                self.collab.audio.play(Cue::CountdownBeep);
                Some(Event::CountdownTick {
                    remaining: self.countdown,
                })
            }
            CalibrationPhase::CountingDown => {
                let now = self.collab.clock.now_ms();
                self.phase = CalibrationPhase::Measuring;
                self.stopwatch.start(now);
                self.elapsed_secs = 0.0;
                self.collab.audio.play(Cue::Start);
                self.collab.ticker.arm(self.config.measure_interval());
                tracing::debug!("calibration measuring");
                Some(Event::MeasurementStarted)
            }
            CalibrationPhase::Measuring => {
                let now = self.collab.clock.now_ms();
                self.elapsed_secs = self.elapsed_secs.max(self.stopwatch.elapsed_secs(now));
                None
            }
            _ => None,
        }
    }

    /// Stop the stopwatch. No-op unless measuring.
    pub fn stop_measuring(&mut self) -> Option<Event> {
        if self.phase != CalibrationPhase::Measuring {
            return None;
        }
        let now = self.collab.clock.now_ms();
        let measurement =
            CalibrationMeasurement::from_measured_time(self.stopwatch.elapsed_secs(now));
        self.collab.ticker.disarm();
        self.elapsed_secs = measurement.measured_time_secs;
        self.result = Some(measurement);
        self.phase = CalibrationPhase::ResultsReady;
        self.collab.audio.play(Cue::Complete);
        tracing::debug!(secs = measurement.measured_time_secs, "calibration measured");
        Some(Event::MeasurementStopped {
            measured_time_secs: measurement.measured_time_secs,
            estimated_distance_m: measurement.estimated_distance_m,
        })
    }

    /// Persist the result. Returns false if there is nothing valid to save
    /// or the store failed; the result stays usable either way.
    pub fn confirm(&mut self) -> bool {
        if self.phase != CalibrationPhase::ResultsReady {
            return false;
        }
        let Some(measurement) = self.result else {
            return false;
        };
        if !measurement.measured_time_secs.is_finite() || measurement.measured_time_secs <= 0.0 {
            tracing::warn!(
                secs = measurement.measured_time_secs,
                "refusing to save an empty measurement"
            );
            return false;
        }
        match self.collab.store.save_calibration(&measurement) {
            Ok(id) => {
                tracing::info!(id, secs = measurement.measured_time_secs, "calibration saved");
                self.saved_id = Some(id);
                self.phase = CalibrationPhase::Saved;
                if let Err(e) = self.refresh_previous() {
                    tracing::warn!("failed to reload calibration: {e}");
                }
                true
            }
            Err(e) => {
                tracing::warn!("failed to save calibration: {e}");
                false
            }
        }
    }

    /// Adopt the stored calibration instead of measuring.
    ///
    /// # Errors
    /// Returns [`CalibrationError::NoPreviousCalibration`] when none was found.
    pub fn load_previous(&mut self) -> Result<CalibrationMeasurement, CalibrationError> {
        let record = self
            .previous
            .as_ref()
            .ok_or(CalibrationError::NoPreviousCalibration)?;
        let measurement = record.measurement;
        let id = record.id;
        self.collab.ticker.disarm();
        self.clear_transient();
        self.result = Some(measurement);
        self.saved_id = Some(id);
        self.phase = CalibrationPhase::Saved;
        Ok(measurement)
    }

    /// Throw away the attempt and return to `Idle`. No-op when idle.
    pub fn discard_and_restart(&mut self) -> Option<Event> {
        if self.phase == CalibrationPhase::Idle {
            return None;
        }
        self.reset()
    }

    pub fn reset(&mut self) -> Option<Event> {
        self.collab.ticker.disarm();
        self.clear_transient();
        self.phase = CalibrationPhase::Idle;
        Some(Event::CalibrationReset)
    }

    fn clear_transient(&mut self) {
        self.countdown = self.config.countdown_from;
        self.stopwatch.clear();
        self.elapsed_secs = 0.0;
        self.result = None;
        self.saved_id = None;
    }
}

impl Drop for CalibrationEngine {
    fn drop(&mut self) {
        self.collab.ticker.disarm();
    }
}
