//! Persistence capability consumed by the engines.

use chrono::NaiveDate;

use crate::error::DatabaseError;
use crate::models::{
    CalibrationMeasurement, CalibrationRecord, CalibrationSuggestion, NewWorkoutSession,
    WorkoutMode, WorkoutSession,
};

/// Workout and calibration persistence.
///
/// Each call is a single statement or a single transaction; callers need
/// no coordination beyond that.
pub trait WorkoutStore {
    fn save_calibration(&self, measurement: &CalibrationMeasurement) -> Result<i64, DatabaseError>;

    /// Most recent calibration, including feedback-adjusted ones.
    fn latest_calibration(&self) -> Result<Option<CalibrationRecord>, DatabaseError>;

    fn calibration_history(&self, limit: u32) -> Result<Vec<CalibrationRecord>, DatabaseError>;

    fn save_workout(&self, session: &NewWorkoutSession) -> Result<i64, DatabaseError>;

    fn workout(&self, id: i64) -> Result<Option<WorkoutSession>, DatabaseError>;

    /// Newest first, optionally filtered by mode.
    fn workout_history(
        &self,
        mode: Option<WorkoutMode>,
        limit: u32,
    ) -> Result<Vec<WorkoutSession>, DatabaseError>;

    /// Inclusive on both ends, newest date first.
    fn workouts_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WorkoutSession>, DatabaseError>;

    /// Highest level reached, ties broken by total reps.
    fn personal_best(&self, mode: WorkoutMode) -> Result<Option<WorkoutSession>, DatabaseError>;

    /// Deletes the session and any suggestions attached to it.
    fn delete_workout(&self, id: i64) -> Result<(), DatabaseError>;

    fn save_calibration_suggestion(
        &self,
        suggestion: &CalibrationSuggestion,
    ) -> Result<i64, DatabaseError>;

    /// Saves the suggestion and, if given, the adjusted calibration in one
    /// transaction. Returns the suggestion id and the calibration id.
    fn record_feedback(
        &self,
        suggestion: &CalibrationSuggestion,
        adjusted: Option<&CalibrationMeasurement>,
    ) -> Result<(i64, Option<i64>), DatabaseError>;
}
