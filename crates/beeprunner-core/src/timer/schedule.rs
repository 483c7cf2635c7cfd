//! Level schedules: the fixed standard protocol and its derivations.
//!
//! All functions here are pure. A [`Schedule`] is never mutated after
//! construction; every adjustment returns a new one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, ValidationError};

/// Reference run time for the standard shuttle distance, in seconds.
pub const REFERENCE_TIME_SECS: f64 = 9.0;

/// Standard shuttle distance, in meters.
pub const REFERENCE_DISTANCE_M: f64 = 20.0;

/// (reps, interval seconds) for levels 1..=9.
const STANDARD_LEVELS: [(u32, f64); 9] = [
    (7, 9.0),
    (8, 8.0),
    (8, 7.5),
    (8, 7.0),
    (9, 6.5),
    (9, 6.2),
    (9, 6.0),
    (9, 5.9),
    (16, 5.8),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub level: u32,
    pub reps: u32,
    pub interval_secs: f64,
}

impl LevelSpec {
    pub fn interval_ms(&self) -> u64 {
        (self.interval_secs * 1000.0).round() as u64
    }

    pub fn duration_secs(&self) -> f64 {
        self.interval_secs * self.reps as f64
    }
}

/// Distance a runner covers at the reference pace in `measured_secs`.
pub fn estimated_distance_m(measured_secs: f64) -> f64 {
    (measured_secs / REFERENCE_TIME_SECS) * REFERENCE_DISTANCE_M
}

/// User feedback after a personal-mode workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    TooEasy,
    Perfect,
    TooHard,
}

impl FeedbackKind {
    /// Interval multiplier: shorter intervals make the next run harder.
    pub fn multiplier(self) -> f64 {
        match self {
            FeedbackKind::TooEasy => 0.9,
            FeedbackKind::Perfect => 1.0,
            FeedbackKind::TooHard => 1.15,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackKind::TooEasy => "too_easy",
            FeedbackKind::Perfect => "perfect",
            FeedbackKind::TooHard => "too_hard",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FeedbackKind {
    type Err = ValidationError;

    /// Accepts both `too_easy` and `too-easy` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "too_easy" => Ok(FeedbackKind::TooEasy),
            "perfect" => Ok(FeedbackKind::Perfect),
            "too_hard" => Ok(FeedbackKind::TooHard),
            other => Err(ValidationError::InvalidValue {
                field: "feedback".into(),
                message: format!("expected too_easy, perfect or too_hard, got '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LevelSpec>", into = "Vec<LevelSpec>")]
pub struct Schedule {
    levels: Vec<LevelSpec>,
}

impl Schedule {
    /// Build a schedule, checking that levels run `1..=N` and that every
    /// level has positive reps and a positive interval.
    pub fn new(levels: Vec<LevelSpec>) -> Result<Self, ValidationError> {
        if levels.is_empty() {
            return Err(ValidationError::EmptyCollection("schedule levels".into()));
        }
        for (index, spec) in levels.iter().enumerate() {
            let expected = index as u32 + 1;
            if spec.level != expected {
                return Err(ValidationError::NonContiguousLevel {
                    index,
                    expected,
                    found: spec.level,
                });
            }
            if spec.reps == 0 {
                return Err(ValidationError::InvalidValue {
                    field: format!("level {expected} reps"),
                    message: "must be > 0".into(),
                });
            }
            if !(spec.interval_secs > 0.0) || !spec.interval_secs.is_finite() {
                return Err(ValidationError::InvalidValue {
                    field: format!("level {expected} interval"),
                    message: format!("must be a positive number, got {}", spec.interval_secs),
                });
            }
        }
        Ok(Self { levels })
    }

    /// A schedule with no levels. Used as a placeholder before a
    /// calibration has been loaded.
    pub fn empty() -> Self {
        Self { levels: Vec::new() }
    }

    /// The fixed 9-level reference protocol.
    pub fn standard() -> Self {
        let levels = STANDARD_LEVELS
            .iter()
            .enumerate()
            .map(|(i, &(reps, interval_secs))| LevelSpec {
                level: i as u32 + 1,
                reps,
                interval_secs,
            })
            .collect();
        Self { levels }
    }

    /// Scale the standard protocol to a user's measured reference time.
    ///
    /// Running the reference distance faster than 9.0s shortens every
    /// interval proportionally; running it slower lengthens them.
    pub fn from_calibration(measured_secs: f64) -> Result<Self, CalibrationError> {
        if !(measured_secs > 0.0) || !measured_secs.is_finite() {
            return Err(CalibrationError::InvalidMeasurement {
                seconds: measured_secs,
            });
        }
        let ratio = REFERENCE_TIME_SECS / measured_secs;
        Ok(Self::standard().map_intervals(|interval| interval / ratio))
    }

    /// Apply a feedback multiplier to every interval.
    pub fn adjusted_for_feedback(&self, feedback: FeedbackKind) -> Self {
        let multiplier = feedback.multiplier();
        self.map_intervals(|interval| interval * multiplier)
    }

    /// Total reps for levels `1..=target_level`, clamped to the schedule.
    pub fn cumulative_reps_through_level(&self, target_level: i64) -> u32 {
        if target_level <= 0 {
            return 0;
        }
        self.levels
            .iter()
            .filter(|spec| i64::from(spec.level) <= target_level)
            .map(|spec| spec.reps)
            .sum()
    }

    pub fn levels(&self) -> &[LevelSpec] {
        &self.levels
    }

    /// Look up a level by its 1-based number.
    pub fn level(&self, level: u32) -> Option<&LevelSpec> {
        let index = (level as usize).checked_sub(1)?;
        self.levels.get(index)
    }

    pub fn first(&self) -> Option<&LevelSpec> {
        self.levels.first()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn max_level(&self) -> u32 {
        self.levels.last().map(|s| s.level).unwrap_or(0)
    }

    pub fn total_reps(&self) -> u32 {
        self.levels.iter().map(|s| s.reps).sum()
    }

    pub fn total_duration_secs(&self) -> f64 {
        self.levels.iter().map(LevelSpec::duration_secs).sum()
    }

    fn map_intervals(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            levels: self
                .levels
                .iter()
                .map(|spec| LevelSpec {
                    interval_secs: f(spec.interval_secs),
                    ..*spec
                })
                .collect(),
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<LevelSpec>> for Schedule {
    type Error = ValidationError;

    fn try_from(levels: Vec<LevelSpec>) -> Result<Self, Self::Error> {
        if levels.is_empty() {
            return Ok(Self::empty());
        }
        Self::new(levels)
    }
}

impl From<Schedule> for Vec<LevelSpec> {
    fn from(schedule: Schedule) -> Self {
        schedule.levels
    }
}
