//! The boundary between SheetFit and the hosted services it depends on.
//!
//! Three collaborators are involved:
//! 1. a script loader that fetches bootstrap resources,
//! 2. an API client exposing Drive lookups and Sheets value calls,
//! 3. an identity provider issuing OAuth access tokens through a callback.
//!
//! The `google` module provides HTTP implementations of the first two.

mod client;
mod error;
mod protocol;

pub use client::{ApiClient, IdentityProvider, ScriptLoader, SheetsApi, TokenCallback};
pub use error::ApiError;
pub use protocol::{
    AccessToken, AppendValuesRequest, AppendValuesResponse, ClientInit, DateTimeRenderOption,
    GetValuesRequest, InsertDataOption, Row, SpreadsheetId, TokenRequest, TokenResponse,
    UpdateValuesResponse, ValueInputOption, ValueRange, ValueRenderOption,
};
