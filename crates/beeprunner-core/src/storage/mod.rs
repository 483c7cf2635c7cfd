mod config;
pub mod database;
pub mod migrations;
pub mod store;

pub use config::{AudioConfig, CalibrationConfig, Config, HistoryConfig, TimerConfig, WorkoutConfig};
pub use database::Database;
pub use store::WorkoutStore;

use std::path::PathBuf;

use crate::error::CoreError;

/// Returns the data directory, creating it if needed.
///
/// `BEEPRUNNER_HOME` overrides the location outright. Otherwise this is
/// `~/.config/beeprunner[-dev]/`, with the `-dev` suffix selected by
/// `BEEPRUNNER_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let dir = match std::env::var_os("BEEPRUNNER_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env =
                std::env::var("BEEPRUNNER_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("beeprunner-dev")
            } else {
                base_dir.join("beeprunner")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
