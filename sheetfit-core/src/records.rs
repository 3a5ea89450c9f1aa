//! Typed records stored as spreadsheet rows.
//!
//! Each record kind owns one sheet. Row 1 holds headers, so data starts at
//! row 2 and the first data row gets id 1. The id column is never written:
//! it is the row position at read time, or the row number reported by the
//! append response at write time.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::api::{DateTimeRenderOption, Row, ValueRenderOption};
use crate::serial_date::{self, SerialDateError};

/// Errors produced while mapping rows and ranges.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("Row is missing cell {0}")]
    MissingCell(usize),

    #[error("Cell is not a serial date: {0}")]
    NotASerialDate(String),

    #[error(transparent)]
    Date(#[from] SerialDateError),

    #[error("Could not read a row number from range '{0}'")]
    UnparseableRange(String),
}

/// A record kind backed by a fixed range of one sheet.
pub trait SheetRecord: Clone + Sized {
    /// Fields supplied by the caller when appending a new record.
    type Draft;

    /// Plural name used in log messages.
    const KIND: &'static str;
    /// Sheet (tab) holding the records.
    const SHEET: &'static str;
    /// Cells read by a fetch, relative to the sheet.
    const READ_CELLS: &'static str;
    /// Anchor cell of an append, relative to the sheet.
    const WRITE_CELL: &'static str;
    /// Header row written when the sheet is created.
    const HEADERS: &'static [&'static str];

    const VALUE_RENDER: Option<ValueRenderOption> = None;
    const DATE_TIME_RENDER: Option<DateTimeRenderOption> = None;

    /// Position of the record in its sheet.
    fn id(&self) -> u32;

    /// Maps one row. `Ok(None)` drops the row silently.
    fn from_row<Tz: TimeZone>(id: u32, row: &[Value], tz: &Tz) -> Result<Option<Self>, RowError>;

    /// Builds the row written for a draft.
    fn to_row<Tz: TimeZone>(draft: &Self::Draft, tz: &Tz) -> Row;

    /// Builds the local record for a draft stored at row `id`.
    fn from_draft<Tz: TimeZone>(id: u32, draft: Self::Draft, tz: &Tz) -> Result<Self, RowError>;

    fn read_range() -> String {
        format!("{}!{}", Self::SHEET, Self::READ_CELLS)
    }

    fn write_range() -> String {
        format!("{}!{}", Self::SHEET, Self::WRITE_CELL)
    }
}

/// Maps rows to records, numbering them by position.
///
/// Numbering happens before filtering, so dropped rows leave gaps and every
/// id stays equal to its row position.
pub fn map_rows<R: SheetRecord, Tz: TimeZone>(rows: &[Row], tz: &Tz) -> Vec<R> {
    rows.iter()
        .zip(1u32..)
        .filter_map(|(row, id)| match R::from_row(id, row, tz) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Skipping {} row {}: {}", R::KIND, id, e);
                None
            }
        })
        .collect()
}

/// Reads the row number of the first cell in an A1 range such as
/// `workout!A5:B5` or `'my sheet'!$A$5`.
pub fn parse_updated_row(range: &str) -> Result<u32, RowError> {
    let cells = range.rsplit_once('!').map(|(_, cells)| cells).unwrap_or(range);
    let first = cells.split(':').next().unwrap_or(cells);
    let digits: String = first
        .chars()
        .skip_while(|c| c.is_ascii_alphabetic() || *c == '$')
        .collect();

    digits
        .parse::<u32>()
        .ok()
        .filter(|row| *row > 0)
        .ok_or_else(|| RowError::UnparseableRange(range.to_string()))
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// An exercise name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub id: u32,
    pub name: String,
}

impl ExerciseRecord {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for ExerciseRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>4}  {}", self.id, self.name)
    }
}

impl SheetRecord for ExerciseRecord {
    type Draft = String;

    const KIND: &'static str = "exercises";
    const SHEET: &'static str = "exercise";
    const READ_CELLS: &'static str = "A2:A";
    const WRITE_CELL: &'static str = "A2";
    const HEADERS: &'static [&'static str] = &["name"];

    fn id(&self) -> u32 {
        self.id
    }

    fn from_row<Tz: TimeZone>(id: u32, row: &[Value], _tz: &Tz) -> Result<Option<Self>, RowError> {
        Ok(row.first().and_then(cell_text).map(|name| Self { id, name }))
    }

    fn to_row<Tz: TimeZone>(name: &String, _tz: &Tz) -> Row {
        vec![Value::String(name.clone())]
    }

    fn from_draft<Tz: TimeZone>(id: u32, name: String, _tz: &Tz) -> Result<Self, RowError> {
        Ok(Self { id, name })
    }
}

/// A performed exercise at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub id: u32,
    pub date: DateTime<Utc>,
    pub exercise: String,
}

impl WorkoutRecord {
    pub fn new(id: u32, date: DateTime<Utc>, exercise: impl Into<String>) -> Self {
        Self {
            id,
            date,
            exercise: exercise.into(),
        }
    }
}

/// Fields of a workout about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkout {
    pub exercise: String,
    pub date: DateTime<Utc>,
}

impl NewWorkout {
    pub fn new(exercise: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            exercise: exercise.into(),
            date,
        }
    }
}

impl SheetRecord for WorkoutRecord {
    type Draft = NewWorkout;

    const KIND: &'static str = "workouts";
    const SHEET: &'static str = "workout";
    const READ_CELLS: &'static str = "A2:AB";
    const WRITE_CELL: &'static str = "B2";
    const HEADERS: &'static [&'static str] = &["date", "exercise"];

    const VALUE_RENDER: Option<ValueRenderOption> = Some(ValueRenderOption::UnformattedValue);
    const DATE_TIME_RENDER: Option<DateTimeRenderOption> = Some(DateTimeRenderOption::SerialNumber);

    fn id(&self) -> u32 {
        self.id
    }

    fn from_row<Tz: TimeZone>(id: u32, row: &[Value], tz: &Tz) -> Result<Option<Self>, RowError> {
        let date_cell = row.first().ok_or(RowError::MissingCell(0))?;
        let serial = date_cell
            .as_f64()
            .ok_or_else(|| RowError::NotASerialDate(date_cell.to_string()))?;
        let date = serial_date::decode(serial, tz)?.with_timezone(&Utc);

        let exercise = row
            .get(1)
            .and_then(cell_text)
            .ok_or(RowError::MissingCell(1))?;

        Ok(Some(Self { id, date, exercise }))
    }

    fn to_row<Tz: TimeZone>(draft: &NewWorkout, tz: &Tz) -> Row {
        let serial = serial_date::encode(&draft.date.with_timezone(tz));
        vec![Value::from(serial), Value::String(draft.exercise.clone())]
    }

    fn from_draft<Tz: TimeZone>(id: u32, draft: NewWorkout, tz: &Tz) -> Result<Self, RowError> {
        // What a later fetch would read back: whole seconds, zone-normalized.
        let serial = serial_date::encode(&draft.date.with_timezone(tz));
        let date = serial_date::decode(serial, tz)?.with_timezone(&Utc);

        Ok(Self {
            id,
            date,
            exercise: draft.exercise,
        })
    }
}
