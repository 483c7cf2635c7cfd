//! SQLite-backed storage.
//!
//! Provides persistent storage for:
//! - Calibration measurements (including feedback-adjusted ones)
//! - Completed workout sessions
//! - Post-workout difficulty suggestions
//! - Key-value application settings

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::data_dir;
use super::migrations;
use super::store::WorkoutStore;
use crate::error::{CoreError, DatabaseError};
use crate::models::{
    CalibrationMeasurement, CalibrationRecord, CalibrationSuggestion, NewWorkoutSession,
    WorkoutMode, WorkoutSession,
};

const WORKOUT_COLUMNS: &str =
    "id, date, workout_mode, max_level, total_reps, duration_minutes, notes, created_at";

/// SQLite database for calibration and workout storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/beeprunner.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("beeprunner.db");
        Ok(Self::open_at(&path)?)
    }

    /// Open (or create) a database file at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // ── Settings ─────────────────────────────────────────────────────

    pub fn get_setting(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT setting_value FROM app_settings WHERE setting_key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO app_settings (setting_key, setting_value, updated_at)
             VALUES (?1, ?2, CURRENT_TIMESTAMP)
             ON CONFLICT(setting_key) DO UPDATE SET
                setting_value = excluded.setting_value,
                updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn all_settings(&self) -> Result<BTreeMap<String, String>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT setting_key, setting_value FROM app_settings")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut settings = BTreeMap::new();
        for row in rows {
            let (key, value): (String, String) = row?;
            settings.insert(key, value);
        }
        Ok(settings)
    }

    /// Delete all calibrations, workouts and suggestions. Settings survive.
    pub fn clear_all_data(&self) -> Result<(), DatabaseError> {
        self.conn.execute_batch(
            "DELETE FROM calibration_suggestions;
             DELETE FROM workout_sessions;
             DELETE FROM calibration;",
        )?;
        Ok(())
    }

    fn query_workouts(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<WorkoutSession>, DatabaseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, workout_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl WorkoutStore for Database {
    fn save_calibration(&self, measurement: &CalibrationMeasurement) -> Result<i64, DatabaseError> {
        insert_calibration(&self.conn, measurement)
    }

    fn latest_calibration(&self) -> Result<Option<CalibrationRecord>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, measured_time, estimated_distance, created_at
                 FROM calibration
                 ORDER BY created_at DESC, id DESC
                 LIMIT 1",
                [],
                calibration_from_row,
            )
            .optional()?)
    }

    fn calibration_history(&self, limit: u32) -> Result<Vec<CalibrationRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, measured_time, estimated_distance, created_at
             FROM calibration
             ORDER BY created_at DESC, id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], calibration_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn save_workout(&self, session: &NewWorkoutSession) -> Result<i64, DatabaseError> {
        self.conn.execute(
            "INSERT INTO workout_sessions
                (date, workout_mode, max_level, total_reps, duration_minutes, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session.date.format("%Y-%m-%d").to_string(),
                session.mode.as_str(),
                session.max_level,
                session.total_reps,
                session.duration_minutes,
                session.notes.as_deref().filter(|n| !n.is_empty()),
                timestamp_now(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn workout(&self, id: i64) -> Result<Option<WorkoutSession>, DatabaseError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {WORKOUT_COLUMNS} FROM workout_sessions WHERE id = ?1"),
                params![id],
                workout_from_row,
            )
            .optional()?)
    }

    fn workout_history(
        &self,
        mode: Option<WorkoutMode>,
        limit: u32,
    ) -> Result<Vec<WorkoutSession>, DatabaseError> {
        match mode {
            Some(mode) => self.query_workouts(
                &format!(
                    "SELECT {WORKOUT_COLUMNS} FROM workout_sessions
                     WHERE workout_mode = ?1
                     ORDER BY created_at DESC, id DESC LIMIT ?2"
                ),
                &[&mode.as_str(), &limit],
            ),
            None => self.query_workouts(
                &format!(
                    "SELECT {WORKOUT_COLUMNS} FROM workout_sessions
                     ORDER BY created_at DESC, id DESC LIMIT ?1"
                ),
                &[&limit],
            ),
        }
    }

    fn workouts_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WorkoutSession>, DatabaseError> {
        self.query_workouts(
            &format!(
                "SELECT {WORKOUT_COLUMNS} FROM workout_sessions
                 WHERE date BETWEEN ?1 AND ?2
                 ORDER BY date DESC, id DESC"
            ),
            &[
                &start.format("%Y-%m-%d").to_string(),
                &end.format("%Y-%m-%d").to_string(),
            ],
        )
    }

    fn personal_best(&self, mode: WorkoutMode) -> Result<Option<WorkoutSession>, DatabaseError> {
        let best = self.query_workouts(
            &format!(
                "SELECT {WORKOUT_COLUMNS} FROM workout_sessions
                 WHERE workout_mode = ?1
                 ORDER BY max_level DESC, total_reps DESC, id ASC
                 LIMIT 1"
            ),
            &[&mode.as_str()],
        )?;
        Ok(best.into_iter().next())
    }

    fn delete_workout(&self, id: i64) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM calibration_suggestions WHERE workout_session_id = ?1",
            params![id],
        )?;
        let deleted = tx.execute("DELETE FROM workout_sessions WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(DatabaseError::NotFound {
                entity: "workout session",
                id,
            });
        }
        tx.commit()?;
        Ok(())
    }

    fn save_calibration_suggestion(
        &self,
        suggestion: &CalibrationSuggestion,
    ) -> Result<i64, DatabaseError> {
        insert_suggestion(&self.conn, suggestion)
    }

    fn record_feedback(
        &self,
        suggestion: &CalibrationSuggestion,
        adjusted: Option<&CalibrationMeasurement>,
    ) -> Result<(i64, Option<i64>), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let suggestion_id = insert_suggestion(&tx, suggestion)?;
        let calibration_id = adjusted
            .map(|measurement| insert_calibration(&tx, measurement))
            .transpose()?;
        tx.commit()?;
        Ok((suggestion_id, calibration_id))
    }
}

fn insert_calibration(
    conn: &Connection,
    measurement: &CalibrationMeasurement,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO calibration (measured_time, estimated_distance, created_at)
         VALUES (?1, ?2, ?3)",
        params![
            measurement.measured_time_secs,
            measurement.estimated_distance_m,
            timestamp_now(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_suggestion(
    conn: &Connection,
    suggestion: &CalibrationSuggestion,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO calibration_suggestions
            (workout_session_id, suggestion_type, user_action, difficulty_multiplier, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            suggestion.workout_session_id,
            suggestion.suggestion_type.as_str(),
            suggestion.user_action.map(|a| a.as_str()),
            suggestion.difficulty_multiplier,
            timestamp_now(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

fn parse_timestamp(row: &Row<'_>, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(column, e))
}

fn calibration_from_row(row: &Row<'_>) -> rusqlite::Result<CalibrationRecord> {
    Ok(CalibrationRecord {
        id: row.get(0)?,
        measurement: CalibrationMeasurement {
            measured_time_secs: row.get(1)?,
            estimated_distance_m: row.get(2)?,
        },
        created_at: parse_timestamp(row, 3)?,
    })
}

fn workout_from_row(row: &Row<'_>) -> rusqlite::Result<WorkoutSession> {
    let date: String = row.get(1)?;
    let mode: String = row.get(2)?;
    Ok(WorkoutSession {
        id: row.get(0)?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| conversion_error(1, e))?,
        mode: mode.parse().map_err(|e| conversion_error(2, e))?,
        max_level: row.get(3)?,
        total_reps: row.get(4)?,
        duration_minutes: row.get::<_, Option<u32>>(5)?.unwrap_or(0),
        notes: row.get(6)?,
        created_at: parse_timestamp(row, 7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SuggestionAction;
    use crate::timer::FeedbackKind;

    fn session(mode: WorkoutMode, date: &str, level: u32, reps: u32) -> NewWorkoutSession {
        NewWorkoutSession {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            mode,
            max_level: level,
            total_reps: reps,
            duration_minutes: 10,
            notes: None,
        }
    }

    #[test]
    fn calibration_roundtrip_returns_latest() {
        let db = Database::open_memory().unwrap();
        assert!(db.latest_calibration().unwrap().is_none());

        db.save_calibration(&CalibrationMeasurement::from_measured_time(8.5))
            .unwrap();
        let second = db
            .save_calibration(&CalibrationMeasurement::from_measured_time(9.5))
            .unwrap();

        let latest = db.latest_calibration().unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert_eq!(latest.measurement.measured_time_secs, 9.5);
        assert_eq!(db.calibration_history(10).unwrap().len(), 2);
        assert_eq!(db.calibration_history(1).unwrap().len(), 1);
    }

    #[test]
    fn workout_history_filters_and_limits() {
        let db = Database::open_memory().unwrap();
        db.save_workout(&session(WorkoutMode::Standard, "2024-05-01", 3, 20))
            .unwrap();
        db.save_workout(&session(WorkoutMode::Personal, "2024-05-02", 4, 28))
            .unwrap();
        let newest = db
            .save_workout(&session(WorkoutMode::Standard, "2024-05-03", 5, 35))
            .unwrap();

        let all = db.workout_history(None, 50).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, newest);

        let standard = db.workout_history(Some(WorkoutMode::Standard), 50).unwrap();
        assert_eq!(standard.len(), 2);
        assert!(standard.iter().all(|w| w.mode == WorkoutMode::Standard));

        assert_eq!(db.workout_history(None, 1).unwrap().len(), 1);
    }

    #[test]
    fn workout_lookup_by_id() {
        let db = Database::open_memory().unwrap();
        let id = db
            .save_workout(&session(WorkoutMode::Standard, "2024-05-01", 3, 20))
            .unwrap();
        let found = db.workout(id).unwrap().unwrap();
        assert_eq!((found.mode, found.max_level, found.total_reps), (WorkoutMode::Standard, 3, 20));
        assert!(db.workout(id + 1).unwrap().is_none());
    }

    #[test]
    fn record_feedback_rolls_back_when_calibration_insert_fails() {
        let db = Database::open_memory().unwrap();
        let id = db
            .save_workout(&session(WorkoutMode::Personal, "2024-05-01", 3, 20))
            .unwrap();
        db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_calibration BEFORE INSERT ON calibration
                 BEGIN SELECT RAISE(ABORT, 'calibration rejected'); END;",
            )
            .unwrap();
        let suggestion = CalibrationSuggestion {
            workout_session_id: id,
            suggestion_type: FeedbackKind::TooEasy,
            user_action: Some(SuggestionAction::Accepted),
            difficulty_multiplier: Some(0.9),
        };
        let adjusted = CalibrationMeasurement::from_measured_time(7.2);

        assert!(db.record_feedback(&suggestion, Some(&adjusted)).is_err());
        let suggestions: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM calibration_suggestions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(suggestions, 0);

        let (suggestion_id, calibration_id) = db.record_feedback(&suggestion, None).unwrap();
        assert!(suggestion_id > 0);
        assert!(calibration_id.is_none());
    }

    #[test]
    fn empty_notes_are_stored_as_null() {
        let db = Database::open_memory().unwrap();
        let mut s = session(WorkoutMode::Standard, "2024-05-01", 1, 3);
        s.notes = Some(String::new());
        db.save_workout(&s).unwrap();
        s.notes = Some("felt good".into());
        db.save_workout(&s).unwrap();

        let history = db.workout_history(None, 10).unwrap();
        assert_eq!(history[0].notes.as_deref(), Some("felt good"));
        assert_eq!(history[1].notes, None);
    }

    #[test]
    fn personal_best_prefers_level_then_reps() {
        let db = Database::open_memory().unwrap();
        db.save_workout(&session(WorkoutMode::Personal, "2024-05-01", 5, 35))
            .unwrap();
        let best = db
            .save_workout(&session(WorkoutMode::Personal, "2024-05-02", 5, 38))
            .unwrap();
        db.save_workout(&session(WorkoutMode::Personal, "2024-05-03", 4, 30))
            .unwrap();
        db.save_workout(&session(WorkoutMode::Standard, "2024-05-03", 9, 83))
            .unwrap();

        let pb = db.personal_best(WorkoutMode::Personal).unwrap().unwrap();
        assert_eq!(pb.id, best);
        assert!(db.personal_best(WorkoutMode::Standard).unwrap().is_some());
    }

    #[test]
    fn date_range_is_inclusive() {
        let db = Database::open_memory().unwrap();
        for day in ["2024-05-01", "2024-05-02", "2024-05-03", "2024-05-04"] {
            db.save_workout(&session(WorkoutMode::Standard, day, 1, 7))
                .unwrap();
        }
        let start = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let range = db.workouts_by_date_range(start, end).unwrap();
        assert_eq!(range.len(), 2);
        assert_eq!(range[0].date, end);
    }

    #[test]
    fn delete_removes_suggestions_too() {
        let db = Database::open_memory().unwrap();
        let id = db
            .save_workout(&session(WorkoutMode::Personal, "2024-05-01", 2, 10))
            .unwrap();
        db.save_calibration_suggestion(&CalibrationSuggestion {
            workout_session_id: id,
            suggestion_type: FeedbackKind::TooHard,
            user_action: Some(SuggestionAction::Accepted),
            difficulty_multiplier: Some(1.15),
        })
        .unwrap();

        db.delete_workout(id).unwrap();

        let remaining: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM calibration_suggestions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(db.workout_history(None, 10).unwrap().is_empty());
        assert!(matches!(
            db.delete_workout(id),
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[test]
    fn settings_are_seeded_and_updatable() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.get_setting("default_mode").unwrap().as_deref(), Some("personal"));
        assert!(db.get_setting("missing").unwrap().is_none());

        db.set_setting("default_mode", "standard").unwrap();
        db.set_setting("units", "metric").unwrap();

        let all = db.all_settings().unwrap();
        assert_eq!(all.get("default_mode").map(String::as_str), Some("standard"));
        assert_eq!(all.get("units").map(String::as_str), Some("metric"));
    }

    #[test]
    fn clear_all_data_keeps_settings() {
        let db = Database::open_memory().unwrap();
        db.save_calibration(&CalibrationMeasurement::from_measured_time(9.0))
            .unwrap();
        db.save_workout(&session(WorkoutMode::Standard, "2024-05-01", 1, 7))
            .unwrap();
        db.clear_all_data().unwrap();
        assert!(db.latest_calibration().unwrap().is_none());
        assert!(db.workout_history(None, 10).unwrap().is_empty());
        assert!(db.get_setting("theme").unwrap().is_some());
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beeprunner.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.save_calibration(&CalibrationMeasurement::from_measured_time(9.0))
                .unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert!(db.latest_calibration().unwrap().is_some());
    }
}
