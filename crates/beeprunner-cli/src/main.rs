use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod terminal;

#[derive(Parser)]
#[command(name = "beeprunner", version, about = "BeepRunner shuttle-run trainer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure your time over the reference distance
    Calibrate(commands::calibrate::CalibrateArgs),
    /// Run a workout
    Run(commands::run::RunArgs),
    /// Rate the difficulty of a personal workout
    Feedback(commands::feedback::FeedbackArgs),
    /// Print a level schedule
    Schedule(commands::schedule::ScheduleArgs),
    /// Workout history
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Stored application settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("BEEPRUNNER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Calibrate(args) => commands::calibrate::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Feedback(args) => commands::feedback::run(args),
        Commands::Schedule(args) => commands::schedule::run(args),
        Commands::History { action } => commands::history::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Settings { action } => commands::settings::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
