//! API boundary error types.

use thiserror::Error;

/// Errors reported by the script loader, the API client or the remote API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    /// Request could not be sent or the connection failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Remote API answered with a non-success status
    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// A call was made before the API it belongs to was loaded
    #[error("API not loaded: {0}")]
    NotLoaded(String),

    /// Remote call rejected without further detail
    #[error("{0}")]
    Rejected(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Http(e.to_string())
        }
    }
}
