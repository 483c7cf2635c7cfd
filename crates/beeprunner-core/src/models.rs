//! Records shared by the engines and the storage layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::timer::{estimated_distance_m, FeedbackKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkoutMode {
    /// Calibration-derived schedule.
    Personal,
    /// Fixed reference schedule.
    Standard,
}

impl WorkoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkoutMode::Personal => "personal",
            WorkoutMode::Standard => "standard",
        }
    }
}

impl fmt::Display for WorkoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for WorkoutMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "personal" => Ok(WorkoutMode::Personal),
            "standard" => Ok(WorkoutMode::Standard),
            other => Err(ValidationError::InvalidValue {
                field: "workout_mode".into(),
                message: format!("expected personal or standard, got '{other}'"),
            }),
        }
    }
}

/// A user's measured time over the reference distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMeasurement {
    pub measured_time_secs: f64,
    pub estimated_distance_m: f64,
}

impl CalibrationMeasurement {
    pub fn from_measured_time(measured_time_secs: f64) -> Self {
        Self {
            measured_time_secs,
            estimated_distance_m: estimated_distance_m(measured_time_secs),
        }
    }

    /// Measurement that yields `adjusted_for_feedback(kind)` of this
    /// measurement's personal schedule.
    pub fn adjusted(&self, kind: FeedbackKind) -> Self {
        Self::from_measured_time(self.measured_time_secs * kind.multiplier())
    }
}

/// A persisted calibration row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    pub id: i64,
    #[serde(flatten)]
    pub measurement: CalibrationMeasurement,
    pub created_at: DateTime<Utc>,
}

/// A workout session ready to be persisted (no id yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorkoutSession {
    pub date: NaiveDate,
    pub mode: WorkoutMode,
    pub max_level: u32,
    pub total_reps: u32,
    pub duration_minutes: u32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: i64,
    pub date: NaiveDate,
    pub mode: WorkoutMode,
    pub max_level: u32,
    pub total_reps: u32,
    pub duration_minutes: u32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionAction {
    Accepted,
    Declined,
    Ignored,
}

impl SuggestionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            SuggestionAction::Accepted => "accepted",
            SuggestionAction::Declined => "declined",
            SuggestionAction::Ignored => "ignored",
        }
    }
}

/// Post-workout difficulty feedback for a personal-mode session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSuggestion {
    pub workout_session_id: i64,
    pub suggestion_type: FeedbackKind,
    pub user_action: Option<SuggestionAction>,
    pub difficulty_multiplier: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_follows_reference_ratio() {
        let m = CalibrationMeasurement::from_measured_time(8.5);
        assert!((m.estimated_distance_m - 18.888_888).abs() < 1e-3);
        let m = CalibrationMeasurement::from_measured_time(30.0);
        assert!((m.estimated_distance_m - 66.666_666).abs() < 1e-3);
    }

    #[test]
    fn sub_second_measurement_is_not_clamped() {
        let m = CalibrationMeasurement::from_measured_time(0.45);
        assert!((m.estimated_distance_m - 1.0).abs() < 1e-9);
    }

    #[test]
    fn adjusted_scales_time_and_distance() {
        let m = CalibrationMeasurement::from_measured_time(10.0);
        let harder = m.adjusted(FeedbackKind::TooEasy);
        assert!((harder.measured_time_secs - 9.0).abs() < 1e-9);
        assert!((harder.estimated_distance_m - 20.0).abs() < 1e-9);
    }

    #[test]
    fn mode_parses() {
        assert_eq!("Standard".parse::<WorkoutMode>().unwrap(), WorkoutMode::Standard);
        assert!("sprint".parse::<WorkoutMode>().is_err());
    }
}
