use clap::Subcommand;
use beeprunner_core::Database;

use super::CliResult;

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Get a stored setting
    Get {
        /// Setting key (e.g. "theme", "voice_guidance")
        key: String,
    },
    /// Store a setting
    Set { key: String, value: String },
    /// List all stored settings
    List {
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: SettingsAction) -> CliResult {
    let db = Database::open()?;
    match action {
        SettingsAction::Get { key } => match db.get_setting(&key)? {
            Some(value) => println!("{value}"),
            None => return Err(format!("no such setting: {key}").into()),
        },
        SettingsAction::Set { key, value } => {
            db.set_setting(&key, &value)?;
            println!("ok");
        }
        SettingsAction::List { json } => {
            let settings = db.all_settings()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                for (key, value) in &settings {
                    println!("{key} = {value}");
                }
            }
        }
    }
    Ok(())
}
