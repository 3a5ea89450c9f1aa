use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::{Args, Subcommand};
use sheetfit_core::{NewWorkout, WorkoutCollection, WorkoutRecord};

use super::{CommandError, OutputFormat};
use crate::config::Config;
use crate::remote::connect;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

#[derive(Args)]
pub struct WorkoutCommand {
    #[command(subcommand)]
    pub command: WorkoutSubcommand,
}

#[derive(Subcommand)]
pub enum WorkoutSubcommand {
    /// List logged workouts
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one workout
    Show {
        /// Workout id, as printed by `list`
        id: u32,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Log a workout
    ///
    /// Prints the spreadsheet row the workout was written to. Rows count
    /// the header, so the id `list` shows for it is one lower.
    Log {
        /// Exercise performed
        exercise: String,

        /// When it was performed (YYYY-MM-DD [HH:MM[:SS]] or RFC 3339, defaults to now)
        #[arg(long, short)]
        date: Option<String>,
    },
}

impl WorkoutCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        match &self.command {
            WorkoutSubcommand::List { format } => list(config, format).await,
            WorkoutSubcommand::Show { id, format } => show(config, *id, format).await,
            WorkoutSubcommand::Log { exercise, date } => {
                let exercise = exercise.trim();
                if exercise.is_empty() {
                    return Err(CommandError::InvalidInput(
                        "Exercise name cannot be empty".to_string(),
                    ));
                }
                let date = match date {
                    Some(s) => parse_date(s, &Local)?,
                    None => Utc::now(),
                };
                log(config, NewWorkout::new(exercise, date)).await
            }
        }
    }
}

async fn list(config: &Config, format: &OutputFormat) -> Result<(), CommandError> {
    let conn = connect(config).await?;
    let mut workouts = WorkoutCollection::new();
    workouts.fetch(conn.api(), &conn.document).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(workouts.items())?),
        OutputFormat::Text => print!("{}", format_workouts(workouts.items(), &Local)),
    }
    Ok(())
}

async fn log(config: &Config, draft: NewWorkout) -> Result<(), CommandError> {
    let conn = connect(config).await?;
    let mut workouts = WorkoutCollection::new();
    let logged = workouts.append(conn.api(), &conn.document, draft).await?;

    print!("{}", format_logged(&logged, &Local));
    Ok(())
}

async fn show(config: &Config, id: u32, format: &OutputFormat) -> Result<(), CommandError> {
    let conn = connect(config).await?;
    let mut workouts = WorkoutCollection::new();
    workouts.fetch(conn.api(), &conn.document).await?;

    let workout = lookup(workouts.get(id), id)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(workout)?),
        OutputFormat::Text => print!("{}", format_workout(workout, &Local)),
    }
    Ok(())
}

fn lookup(found: Option<&WorkoutRecord>, id: u32) -> Result<&WorkoutRecord, CommandError> {
    found.ok_or_else(|| CommandError::NotFound(format!("Workout not found: {}", id)))
}

fn format_workout<Tz: TimeZone>(workout: &WorkoutRecord, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "Workout {}\n  id: {}\n  date: {}\n",
        workout.exercise,
        workout.id,
        workout.date.with_timezone(tz).format("%Y-%m-%d %H:%M")
    )
}

/// An appended record carries its sheet row, not its list position.
fn format_logged<Tz: TimeZone>(workout: &WorkoutRecord, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "Logged workout {} at {} (sheet row {})\n",
        workout.exercise,
        workout.date.with_timezone(tz).format("%Y-%m-%d %H:%M"),
        workout.id
    )
}

/// Parses a user-supplied date. Dates without an offset are read in `tz`;
/// a bare day means midnight.
fn parse_date<Tz: TimeZone>(s: &str, tz: &Tz) -> Result<DateTime<Utc>, CommandError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| CommandError::InvalidInput(format!("Invalid date: {}", s)))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| CommandError::InvalidInput(format!("Date does not exist locally: {}", s)))
}

fn format_workouts<Tz: TimeZone>(workouts: &[WorkoutRecord], tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if workouts.is_empty() {
        return "No workouts found.\n".to_string();
    }

    let mut out = String::new();
    for workout in workouts {
        out.push_str(&format!(
            "{:>4}  {}  {}\n",
            workout.id,
            workout.date.with_timezone(tz).format("%Y-%m-%d %H:%M"),
            workout.exercise
        ));
    }
    out.push_str(&format!("\nTotal: {} workout(s)\n", workouts.len()));
    out
}
