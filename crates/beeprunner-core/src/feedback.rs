//! Post-workout difficulty feedback.
//!
//! Personal intervals scale linearly with the measured calibration time, so
//! feedback is applied by storing a new calibration whose measured time is
//! scaled by the feedback multiplier. The next personal schedule derived
//! from it equals the old schedule adjusted for that feedback.

use serde::Serialize;

use crate::error::DatabaseError;
use crate::models::{
    CalibrationMeasurement, CalibrationSuggestion, SuggestionAction, WorkoutMode,
};
use crate::storage::WorkoutStore;
use crate::timer::FeedbackKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackOutcome {
    pub suggestion_id: i64,
    pub kind: FeedbackKind,
    pub multiplier: f64,
    /// Calibration stored for the next personal workout, if one changed.
    pub adjusted: Option<AdjustedCalibration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdjustedCalibration {
    pub id: i64,
    pub measurement: CalibrationMeasurement,
}

/// Record the user's verdict on a session and adjust the calibration.
///
/// `current` is the calibration the session ran on. Only personal sessions
/// adjust it; for `Perfect`, standard sessions or a missing calibration the
/// suggestion is recorded alone. Both rows are written in one transaction.
///
/// # Errors
/// Returns `NotFound` for an unknown session, or the storage error if the
/// write fails. Nothing is stored in either case.
pub fn apply_feedback(
    store: &dyn WorkoutStore,
    session_id: i64,
    kind: FeedbackKind,
    current: Option<&CalibrationMeasurement>,
) -> Result<FeedbackOutcome, DatabaseError> {
    let session = store.workout(session_id)?.ok_or(DatabaseError::NotFound {
        entity: "workout session",
        id: session_id,
    })?;
    let multiplier = kind.multiplier();
    let target = match (kind, session.mode, current) {
        (FeedbackKind::Perfect, _, _) | (_, WorkoutMode::Standard, _) | (_, _, None) => None,
        (_, WorkoutMode::Personal, Some(current)) => Some((current, current.adjusted(kind))),
    };
    let suggestion = CalibrationSuggestion {
        workout_session_id: session_id,
        suggestion_type: kind,
        user_action: Some(match session.mode {
            WorkoutMode::Personal => SuggestionAction::Accepted,
            WorkoutMode::Standard => SuggestionAction::Ignored,
        }),
        difficulty_multiplier: Some(multiplier),
    };

    let (suggestion_id, calibration_id) =
        store.record_feedback(&suggestion, target.as_ref().map(|(_, next)| next))?;

    let adjusted = target.zip(calibration_id).map(|((current, measurement), id)| {
        tracing::info!(
            id,
            from = current.measured_time_secs,
            to = measurement.measured_time_secs,
            "calibration adjusted for feedback"
        );
        AdjustedCalibration { id, measurement }
    });
    if session.mode == WorkoutMode::Standard {
        tracing::debug!(session_id, "feedback on a standard session leaves calibration alone");
    }

    Ok(FeedbackOutcome {
        suggestion_id,
        kind,
        multiplier,
        adjusted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    use crate::models::NewWorkoutSession;
    use crate::storage::store::testing::FailingStore;
    use crate::storage::Database;
    use crate::timer::Schedule;

    fn seeded() -> (Database, i64, CalibrationMeasurement) {
        seeded_with(WorkoutMode::Personal)
    }

    fn seeded_with(mode: WorkoutMode) -> (Database, i64, CalibrationMeasurement) {
        let db = Database::open_memory().unwrap();
        let measurement = CalibrationMeasurement::from_measured_time(8.0);
        db.save_calibration(&measurement).unwrap();
        let session = db
            .save_workout(&NewWorkoutSession {
                date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                mode,
                max_level: 4,
                total_reps: 29,
                duration_minutes: 4,
                notes: None,
            })
            .unwrap();
        (db, session, measurement)
    }

    fn suggestion_count(db: &Database) -> i64 {
        db.conn()
            .query_row("SELECT COUNT(*) FROM calibration_suggestions", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn too_hard_lengthens_next_schedule() {
        let (db, session, current) = seeded();
        let outcome = apply_feedback(&db, session, FeedbackKind::TooHard, Some(&current)).unwrap();
        assert_eq!(outcome.multiplier, 1.15);
        let adjusted = outcome.adjusted.unwrap();
        assert!((adjusted.measurement.measured_time_secs - 9.2).abs() < 1e-9);

        let latest = db.latest_calibration().unwrap().unwrap();
        assert_eq!(latest.id, adjusted.id);

        let expected = Schedule::from_calibration(8.0)
            .unwrap()
            .adjusted_for_feedback(FeedbackKind::TooHard);
        let next = Schedule::from_calibration(latest.measurement.measured_time_secs).unwrap();
        for (a, b) in next.levels().iter().zip(expected.levels()) {
            assert!((a.interval_secs - b.interval_secs).abs() < 1e-9);
        }
        assert_eq!(suggestion_count(&db), 1);
    }

    #[test]
    fn perfect_only_records_suggestion() {
        let (db, session, current) = seeded();
        let before = db.calibration_history(10).unwrap().len();
        let outcome = apply_feedback(&db, session, FeedbackKind::Perfect, Some(&current)).unwrap();
        assert!(outcome.adjusted.is_none());
        assert_eq!(db.calibration_history(10).unwrap().len(), before);
        assert_eq!(suggestion_count(&db), 1);
    }

    #[test]
    fn missing_calibration_only_records_suggestion() {
        let (db, session, _) = seeded();
        let outcome = apply_feedback(&db, session, FeedbackKind::TooEasy, None).unwrap();
        assert!(outcome.adjusted.is_none());
        assert_eq!(outcome.multiplier, 0.9);
    }

    #[test]
    fn unknown_session_is_rejected() {
        let (db, _, current) = seeded();
        assert!(matches!(
            apply_feedback(&db, 9_999, FeedbackKind::TooEasy, Some(&current)),
            Err(DatabaseError::NotFound { id: 9_999, .. })
        ));
        assert_eq!(suggestion_count(&db), 0);
    }

    #[test]
    fn standard_session_keeps_personal_calibration() {
        let (db, session, current) = seeded_with(WorkoutMode::Standard);
        let outcome = apply_feedback(&db, session, FeedbackKind::TooEasy, Some(&current)).unwrap();
        assert!(outcome.adjusted.is_none());
        assert_eq!(outcome.multiplier, 0.9);

        let latest = db.latest_calibration().unwrap().unwrap();
        assert_eq!(latest.measurement.measured_time_secs, 8.0);
        assert_eq!(db.calibration_history(10).unwrap().len(), 1);
        let action: String = db
            .conn()
            .query_row("SELECT user_action FROM calibration_suggestions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(action, "ignored");
    }

    #[test]
    fn storage_failure_is_reported() {
        let current = CalibrationMeasurement::from_measured_time(8.0);
        let result = apply_feedback(&FailingStore, 1, FeedbackKind::TooHard, Some(&current));
        assert!(matches!(result, Err(DatabaseError::Locked)));
    }
}
