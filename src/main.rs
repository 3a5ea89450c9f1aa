use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod remote;

use commands::{AuthCommand, ConfigCommand, ExerciseCommand, WorkoutCommand};
use config::Config;

#[derive(Parser)]
#[command(name = "sheetfit")]
#[command(version)]
#[command(about = "Track exercises and workouts in a Google Sheets spreadsheet", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and out of Google
    Auth(AuthCommand),

    /// Manage exercises
    Exercise(ExerciseCommand),

    /// Log and list workouts
    Workout(WorkoutCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetfit=warn,sheetfit_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Config commands load the file themselves so `init` works on a broken one
    match cli.command {
        Some(Commands::Config(cmd)) => cmd.run(cli.config.as_deref())?,
        Some(Commands::Auth(cmd)) => cmd.run(&Config::load(cli.config)?).await?,
        Some(Commands::Exercise(cmd)) => cmd.run(&Config::load(cli.config)?).await?,
        Some(Commands::Workout(cmd)) => cmd.run(&Config::load(cli.config)?).await?,
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
