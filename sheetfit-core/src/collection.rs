//! In-memory record lists kept in step with their sheet.

use chrono::{Local, TimeZone};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::api::{ApiError, AppendValuesRequest, GetValuesRequest, SheetsApi, SpreadsheetId};
use crate::records::{self, ExerciseRecord, RowError, SheetRecord, WorkoutRecord};

/// Errors from collection operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectionError {
    #[error("Failed to read {range}: {source}")]
    Read { range: String, source: ApiError },

    #[error("Failed to append to {range}: {source}")]
    Append { range: String, source: ApiError },

    #[error("Append to {range} did not report an updated range")]
    MissingUpdatedRange { range: String },

    #[error(transparent)]
    Row(#[from] RowError),
}

/// Result of a successful fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Items were replaced by this many mapped records.
    Replaced(usize),
    /// The sheet returned no rows; items were kept.
    Unchanged,
}

/// Records of one kind, plus whether they were ever fetched.
///
/// Failed operations leave both the items and the synced flag untouched.
#[derive(Debug, Clone)]
pub struct SyncedCollection<R, Tz: TimeZone = Local> {
    items: Vec<R>,
    synced: bool,
    tz: Tz,
}

pub type ExerciseCollection = SyncedCollection<ExerciseRecord>;
pub type WorkoutCollection = SyncedCollection<WorkoutRecord>;

impl<R: SheetRecord> SyncedCollection<R, Local> {
    pub fn new() -> Self {
        Self::with_timezone(Local)
    }
}

impl<R: SheetRecord> Default for SyncedCollection<R, Local> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: SheetRecord, Tz: TimeZone> SyncedCollection<R, Tz> {
    /// Creates an empty collection whose dates are read in `tz`.
    pub fn with_timezone(tz: Tz) -> Self {
        Self {
            items: Vec::new(),
            synced: false,
            tz,
        }
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    /// Looks a record up by id. Ids are not contiguous, so this searches
    /// rather than indexes.
    pub fn get(&self, id: u32) -> Option<&R> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Reads the sheet and replaces the items with its rows.
    ///
    /// An empty read keeps the current items but still marks the collection
    /// synced.
    pub async fn fetch<A: SheetsApi>(
        &mut self,
        api: &A,
        document: &SpreadsheetId,
    ) -> Result<FetchOutcome, CollectionError> {
        let request = GetValuesRequest {
            spreadsheet_id: document.clone(),
            range: R::read_range(),
            value_render_option: R::VALUE_RENDER,
            date_time_render_option: R::DATE_TIME_RENDER,
        };
        debug!("Reading {} from {}", R::KIND, request.range);

        let response = match api.get_values(&request).await {
            Ok(response) => response,
            Err(source) => {
                let e = CollectionError::Read {
                    range: request.range,
                    source,
                };
                error!("{}", e);
                return Err(e);
            }
        };

        let outcome = match response.values {
            Some(rows) if !rows.is_empty() => {
                self.items = records::map_rows(&rows, &self.tz);
                FetchOutcome::Replaced(self.items.len())
            }
            _ => FetchOutcome::Unchanged,
        };
        self.synced = true;

        info!("{} synced successfully", R::KIND);
        Ok(outcome)
    }

    /// Appends a record to the sheet and, once stored, to the items.
    ///
    /// The new record's id is the row number the sheet reports for it.
    pub async fn append<A: SheetsApi>(
        &mut self,
        api: &A,
        document: &SpreadsheetId,
        draft: R::Draft,
    ) -> Result<R, CollectionError> {
        match self.append_remote(api, document, draft).await {
            Ok(record) => {
                self.items.push(record.clone());
                info!("{} updated successfully", R::KIND);
                Ok(record)
            }
            Err(e) => {
                error!("{}", e);
                Err(e)
            }
        }
    }

    async fn append_remote<A: SheetsApi>(
        &self,
        api: &A,
        document: &SpreadsheetId,
        draft: R::Draft,
    ) -> Result<R, CollectionError> {
        let range = R::write_range();
        let request = AppendValuesRequest::insert_rows(
            document.clone(),
            range.clone(),
            vec![R::to_row(&draft, &self.tz)],
        );
        debug!("Appending to {}", range);

        let response = api
            .append_values(&request)
            .await
            .map_err(|source| CollectionError::Append {
                range: range.clone(),
                source,
            })?;

        let updated_range = response
            .updates
            .and_then(|updates| updates.updated_range)
            .ok_or(CollectionError::MissingUpdatedRange { range })?;
        let row = records::parse_updated_row(&updated_range)?;

        Ok(R::from_draft(row, draft, &self.tz)?)
    }
}
