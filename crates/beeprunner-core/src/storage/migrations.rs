//! Database schema migrations for beeprunner.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Settings seeded on first open. Existing values are never overwritten.
pub const DEFAULT_SETTINGS: [(&str, &str); 5] = [
    ("language", "auto"),
    ("theme", "system"),
    ("voice_guidance", "true"),
    ("haptic_feedback", "true"),
    ("default_mode", "personal"),
];

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Returns 0 if no version is set (initial database).
pub(crate) fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!("failed to read schema_version: {e}");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: calibration, workout, suggestion and settings tables.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS calibration (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            measured_time      REAL NOT NULL,
            estimated_distance REAL NOT NULL,
            created_at         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS workout_sessions (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            date             TEXT NOT NULL,
            workout_mode     TEXT NOT NULL CHECK (workout_mode IN ('personal', 'standard')),
            max_level        INTEGER NOT NULL,
            total_reps       INTEGER NOT NULL,
            duration_minutes INTEGER,
            notes            TEXT,
            created_at       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS calibration_suggestions (
            id                    INTEGER PRIMARY KEY AUTOINCREMENT,
            workout_session_id    INTEGER NOT NULL,
            suggestion_type       TEXT NOT NULL CHECK (suggestion_type IN ('too_easy', 'perfect', 'too_hard')),
            user_action           TEXT CHECK (user_action IN ('accepted', 'declined', 'ignored')),
            difficulty_multiplier REAL,
            created_at            TEXT NOT NULL,
            FOREIGN KEY (workout_session_id) REFERENCES workout_sessions(id)
        );

        CREATE TABLE IF NOT EXISTS app_settings (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            setting_key   TEXT NOT NULL UNIQUE,
            setting_value TEXT NOT NULL,
            updated_at    TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: history indexes and default settings.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_workout_sessions_date ON workout_sessions(date);
         CREATE INDEX IF NOT EXISTS idx_workout_sessions_mode ON workout_sessions(workout_mode);
         CREATE INDEX IF NOT EXISTS idx_calibration_created_at ON calibration(created_at);",
    )?;

    for (key, value) in DEFAULT_SETTINGS {
        tx.execute(
            "INSERT OR IGNORE INTO app_settings (setting_key, setting_value) VALUES (?1, ?2)",
            [key, value],
        )?;
    }

    set_schema_version(&tx, 2)?;
    tx.commit()
}
