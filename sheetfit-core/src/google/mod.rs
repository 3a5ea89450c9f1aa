//! HTTP implementations of the API boundary, talking to the Google Drive v3
//! and Sheets v4 REST APIs.

mod client;
mod script_loader;

pub use client::GoogleApiClient;
pub use script_loader::HttpScriptLoader;

use serde::Deserialize;

use crate::api::ApiError;

/// Base URL of the Google API discovery service.
pub const DISCOVERY_SERVICE_URL: &str = "https://www.googleapis.com/discovery/v1/apis";

pub const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Builds an error from a non-success status and the response body.
fn status_error(status: u16, body: &str) -> ApiError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => match parsed.error.status {
            Some(kind) => format!("{} ({})", parsed.error.message, kind),
            None => parsed.error.message,
        },
        Err(_) if body.trim().is_empty() => "empty response".to_string(),
        Err(_) => body.trim().to_string(),
    };

    ApiError::Status { status, message }
}

/// Reads a response, mapping non-success statuses to `ApiError::Status`.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(status_error(status.as_u16(), &body))
}
