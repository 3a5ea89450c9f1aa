//! SheetFit Core Library
//!
//! Workout and exercise records kept in a Google Sheets spreadsheet: the
//! serial-date codec, row mapping, the remote session and synced collections.

pub mod api;
pub mod collection;
pub mod google;
pub mod records;
pub mod serial_date;
pub mod session;

#[cfg(test)]
mod testing;

pub use api::{
    AccessToken, ApiClient, ApiError, IdentityProvider, ScriptLoader, SheetsApi, SpreadsheetId,
    TokenCallback, TokenRequest, TokenResponse,
};
pub use collection::{
    CollectionError, ExerciseCollection, FetchOutcome, SyncedCollection, WorkoutCollection,
};
pub use google::{GoogleApiClient, HttpScriptLoader};
pub use records::{ExerciseRecord, NewWorkout, RowError, SheetRecord, WorkoutRecord};
pub use serial_date::SerialDateError;
pub use session::{
    ClientPhase, DocumentPhase, Session, SessionConfig, SessionError, SessionState,
};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
