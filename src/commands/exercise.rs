use clap::{Args, Subcommand};
use sheetfit_core::{ExerciseCollection, ExerciseRecord};

use super::{CommandError, OutputFormat};
use crate::config::Config;
use crate::remote::connect;

#[derive(Args)]
pub struct ExerciseCommand {
    #[command(subcommand)]
    pub command: ExerciseSubcommand,
}

#[derive(Subcommand)]
pub enum ExerciseSubcommand {
    /// List known exercises
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one exercise
    Show {
        /// Exercise id, as printed by `list`
        id: u32,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add an exercise
    ///
    /// Prints the spreadsheet row the exercise was written to. Rows count
    /// the header, so the id `list` shows for it is one lower.
    Add {
        /// Name of the exercise
        name: String,
    },
}

impl ExerciseCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        match &self.command {
            ExerciseSubcommand::List { format } => list(config, format).await,
            ExerciseSubcommand::Show { id, format } => show(config, *id, format).await,
            ExerciseSubcommand::Add { name } => add(config, validate_name(name)?).await,
        }
    }
}

async fn list(config: &Config, format: &OutputFormat) -> Result<(), CommandError> {
    let conn = connect(config).await?;
    let mut exercises = ExerciseCollection::new();
    exercises.fetch(conn.api(), &conn.document).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(exercises.items())?),
        OutputFormat::Text => print!("{}", format_exercises(exercises.items())),
    }
    Ok(())
}

async fn show(config: &Config, id: u32, format: &OutputFormat) -> Result<(), CommandError> {
    let conn = connect(config).await?;
    let mut exercises = ExerciseCollection::new();
    exercises.fetch(conn.api(), &conn.document).await?;

    let exercise = lookup(exercises.get(id), id)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(exercise)?),
        OutputFormat::Text => print!("{}", format_exercise(exercise)),
    }
    Ok(())
}

async fn add(config: &Config, name: String) -> Result<(), CommandError> {
    let conn = connect(config).await?;
    let mut exercises = ExerciseCollection::new();
    let added = exercises.append(conn.api(), &conn.document, name).await?;

    print!("{}", format_added(&added));
    Ok(())
}

fn lookup(found: Option<&ExerciseRecord>, id: u32) -> Result<&ExerciseRecord, CommandError> {
    found.ok_or_else(|| CommandError::NotFound(format!("Exercise not found: {}", id)))
}

fn format_exercise(exercise: &ExerciseRecord) -> String {
    format!("Exercise {}\n  id: {}\n", exercise.name, exercise.id)
}

/// An appended record carries its sheet row, not its list position.
fn format_added(exercise: &ExerciseRecord) -> String {
    format!("Added exercise {} at sheet row {}\n", exercise.name, exercise.id)
}

fn validate_name(name: &str) -> Result<String, CommandError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CommandError::InvalidInput(
            "Exercise name cannot be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn format_exercises(exercises: &[ExerciseRecord]) -> String {
    if exercises.is_empty() {
        return "No exercises found.\n".to_string();
    }

    let mut out = String::new();
    for exercise in exercises {
        out.push_str(&format!("{}\n", exercise));
    }
    out.push_str(&format!("\nTotal: {} exercise(s)\n", exercises.len()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_exercises() {
        let exercises = vec![
            ExerciseRecord::new(1, "curls"),
            ExerciseRecord::new(3, "deadlift"),
        ];

        assert_eq!(
            format_exercises(&exercises),
            "   1  curls\n   3  deadlift\n\nTotal: 2 exercise(s)\n"
        );
    }

    #[test]
    fn test_format_no_exercises() {
        assert_eq!(format_exercises(&[]), "No exercises found.\n");
    }

    #[test]
    fn test_show_found_exercise() {
        let squat = ExerciseRecord::new(2, "squat");

        let found = lookup(Some(&squat), 2).unwrap();
        assert_eq!(format_exercise(found), "Exercise squat\n  id: 2\n");
    }

    #[test]
    fn test_show_missing_exercise() {
        let err = lookup(None, 7).unwrap_err();
        assert!(matches!(err, CommandError::NotFound(_)));
        assert_eq!(err.to_string(), "Exercise not found: 7");
    }

    #[test]
    fn test_format_added_names_sheet_row() {
        let added = ExerciseRecord::new(5, "lunges");
        assert_eq!(format_added(&added), "Added exercise lunges at sheet row 5\n");
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  squat ").unwrap(), "squat");
        assert!(validate_name("   ").is_err());
    }
}
