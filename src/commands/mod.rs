mod auth;
mod config_cmd;
mod exercise;
mod workout;

pub use auth::AuthCommand;
pub use config_cmd::ConfigCommand;
pub use exercise::ExerciseCommand;
pub use workout::WorkoutCommand;

use clap::ValueEnum;
use sheetfit_core::{CollectionError, SessionError};
use std::io;

use crate::config::ConfigError;
use crate::remote::AuthError;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Errors surfaced by CLI commands
#[derive(Debug)]
pub enum CommandError {
    Config(ConfigError),
    Auth(AuthError),
    Session(SessionError),
    Collection(CollectionError),
    /// Command-line input could not be used
    InvalidInput(String),
    /// No record with the requested id
    NotFound(String),
    IoError(io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Config(e) => write!(f, "{}", e),
            CommandError::Auth(e) => write!(f, "{}", e),
            CommandError::Session(e) => write!(f, "{}", e),
            CommandError::Collection(e) => write!(f, "{}", e),
            CommandError::InvalidInput(msg) => write!(f, "{}", msg),
            CommandError::NotFound(msg) => write!(f, "{}", msg),
            CommandError::IoError(e) => write!(f, "I/O error: {}", e),
            CommandError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<ConfigError> for CommandError {
    fn from(e: ConfigError) -> Self {
        CommandError::Config(e)
    }
}

impl From<AuthError> for CommandError {
    fn from(e: AuthError) -> Self {
        CommandError::Auth(e)
    }
}

impl From<SessionError> for CommandError {
    fn from(e: SessionError) -> Self {
        CommandError::Session(e)
    }
}

impl From<CollectionError> for CommandError {
    fn from(e: CollectionError) -> Self {
        CommandError::Collection(e)
    }
}

impl From<io::Error> for CommandError {
    fn from(e: io::Error) -> Self {
        CommandError::IoError(e)
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        CommandError::Json(e)
    }
}
