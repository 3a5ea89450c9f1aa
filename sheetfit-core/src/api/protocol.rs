//! Request and response types for the Sheets/Drive APIs and the token flow.
//!
//! Field names use camelCase to match the Google REST payloads.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A single spreadsheet row as returned by the values API.
pub type Row = Vec<serde_json::Value>;

/// Identifier of the backing spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpreadsheetId(String);

impl SpreadsheetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SpreadsheetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How values are rendered in a read response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRenderOption {
    UnformattedValue,
}

impl ValueRenderOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueRenderOption::UnformattedValue => "UNFORMATTED_VALUE",
        }
    }
}

/// How dates are rendered when values are unformatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeRenderOption {
    SerialNumber,
}

impl DateTimeRenderOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateTimeRenderOption::SerialNumber => "SERIAL_NUMBER",
        }
    }
}

/// Whether appended data overwrites or inserts rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertDataOption {
    InsertRows,
}

impl InsertDataOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsertDataOption::InsertRows => "INSERT_ROWS",
        }
    }
}

/// How input values are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueInputOption {
    Raw,
}

impl ValueInputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueInputOption::Raw => "RAW",
        }
    }
}

/// Parameters of a `spreadsheets.values.get` call.
#[derive(Debug, Clone, PartialEq)]
pub struct GetValuesRequest {
    pub spreadsheet_id: SpreadsheetId,
    pub range: String,
    pub value_render_option: Option<ValueRenderOption>,
    pub date_time_render_option: Option<DateTimeRenderOption>,
}

/// Parameters of a `spreadsheets.values.append` call.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendValuesRequest {
    pub spreadsheet_id: SpreadsheetId,
    pub range: String,
    pub insert_data_option: InsertDataOption,
    pub value_input_option: ValueInputOption,
    pub include_values_in_response: bool,
    pub response_value_render_option: ValueRenderOption,
    pub response_date_time_render_option: DateTimeRenderOption,
    pub values: Vec<Row>,
}

impl AppendValuesRequest {
    /// Appends `values` as new rows, raw input, reporting the updated range
    /// with unformatted values and serial-number dates.
    pub fn insert_rows(spreadsheet_id: SpreadsheetId, range: String, values: Vec<Row>) -> Self {
        Self {
            spreadsheet_id,
            range,
            insert_data_option: InsertDataOption::InsertRows,
            value_input_option: ValueInputOption::Raw,
            include_values_in_response: true,
            response_value_render_option: ValueRenderOption::UnformattedValue,
            response_date_time_render_option: DateTimeRenderOption::SerialNumber,
            values,
        }
    }
}

/// A range of values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Row>>,
}

impl ValueRange {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self {
            values: Some(rows),
            ..Default::default()
        }
    }
}

/// Response of a `spreadsheets.values.append` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendValuesResponse {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default)]
    pub table_range: Option<String>,
    #[serde(default)]
    pub updates: Option<UpdateValuesResponse>,
}

impl AppendValuesResponse {
    pub fn with_updated_range(range: impl Into<String>) -> Self {
        Self {
            updates: Some(UpdateValuesResponse {
                updated_range: Some(range.into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Summary of the cells touched by a write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    #[serde(default)]
    pub spreadsheet_id: Option<String>,
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub updated_rows: Option<u32>,
    #[serde(default)]
    pub updated_columns: Option<u32>,
    #[serde(default)]
    pub updated_cells: Option<u32>,
    #[serde(default)]
    pub updated_data: Option<ValueRange>,
}

/// Configuration handed to the API client once a token is being requested.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientInit {
    pub api_key: String,
    pub discovery_docs: Vec<String>,
}

/// Parameters of an access token request.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRequest {
    pub client_id: String,
    pub scope: String,
    /// Consent prompt hint; empty lets the provider skip consent when possible.
    pub prompt: String,
}

/// Payload delivered to a token callback: either an error or a token.
///
/// Matches the JSON answered by the Google token endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl TokenResponse {
    pub fn success(access_token: impl Into<String>, expires_in: Option<i64>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            expires_in,
            token_type: Some("Bearer".to_string()),
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>, description: Option<String>) -> Self {
        Self {
            error: Some(error.into()),
            error_description: description,
            ..Default::default()
        }
    }

    /// Converts into a token, or into `(error, description)`.
    ///
    /// A response without an error but also without a token counts as an error.
    pub fn into_access_token(self) -> Result<AccessToken, (String, Option<String>)> {
        if let Some(error) = self.error {
            return Err((error, self.error_description));
        }

        match self.access_token {
            Some(token) => {
                let expires_at = self
                    .expires_in
                    .filter(|secs| *secs > 0)
                    .map(|secs| Utc::now() + Duration::seconds(secs));
                Ok(AccessToken { token, expires_at })
            }
            None => Err((
                "missing_access_token".to_string(),
                Some("Token response carried neither a token nor an error".to_string()),
            )),
        }
    }
}

/// An OAuth bearer token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// True when the token expires within `margin` from now.
    pub fn expires_within(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + margin >= expires_at,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_range_without_values() {
        let parsed: ValueRange =
            serde_json::from_str(r#"{"range":"exercise!A2:A1000","majorDimension":"ROWS"}"#)
                .unwrap();
        assert_eq!(parsed.range.as_deref(), Some("exercise!A2:A1000"));
        assert!(parsed.values.is_none());
    }

    #[test]
    fn test_append_response_parses_updated_range() {
        let json = r#"{
            "spreadsheetId": "abc",
            "tableRange": "workout!A1:B4",
            "updates": {
                "spreadsheetId": "abc",
                "updatedRange": "workout!A5:B5",
                "updatedRows": 1,
                "updatedColumns": 2,
                "updatedCells": 2
            }
        }"#;
        let parsed: AppendValuesResponse = serde_json::from_str(json).unwrap();
        let updates = parsed.updates.unwrap();
        assert_eq!(updates.updated_range.as_deref(), Some("workout!A5:B5"));
        assert_eq!(updates.updated_rows, Some(1));
    }

    #[test]
    fn test_render_options_use_api_constants() {
        assert_eq!(ValueRenderOption::UnformattedValue.as_str(), "UNFORMATTED_VALUE");
        assert_eq!(DateTimeRenderOption::SerialNumber.as_str(), "SERIAL_NUMBER");
        assert_eq!(InsertDataOption::InsertRows.as_str(), "INSERT_ROWS");
        assert_eq!(ValueInputOption::Raw.as_str(), "RAW");
    }

    #[test]
    fn test_token_response_error_wins() {
        let response = TokenResponse {
            access_token: Some("ignored".to_string()),
            error: Some("access_denied".to_string()),
            ..Default::default()
        };
        let (error, _) = response.into_access_token().unwrap_err();
        assert_eq!(error, "access_denied");
    }

    #[test]
    fn test_token_response_success_sets_expiry() {
        let token = TokenResponse::success("ya29.token", Some(3599))
            .into_access_token()
            .unwrap();
        assert_eq!(token.token, "ya29.token");
        assert!(token.expires_at.is_some());
        assert!(!token.expires_within(Duration::seconds(60)));
        assert!(token.expires_within(Duration::seconds(7200)));
    }

    #[test]
    fn test_token_response_without_token_is_error() {
        let (error, _) = TokenResponse::default().into_access_token().unwrap_err();
        assert_eq!(error, "missing_access_token");
    }
}
