//! Connecting the command line to the backing spreadsheet: the browser-based
//! OAuth flow, the on-disk token cache and session setup.

mod connect;
mod oauth;
mod token_cache;

pub use connect::{connect, open_session};
pub use token_cache::{CachedToken, TokenCache};

use std::io;
use std::path::PathBuf;

/// Errors that can occur while obtaining or storing a token
#[derive(Debug)]
pub enum AuthError {
    /// I/O error
    IoError(io::Error),
    /// HTTP request error
    HttpError(String),
    /// Token cache could not be read or written
    CacheError(PathBuf, String),
    /// The user or the provider refused the authorization request
    Denied(String),
    /// Redirect carried a state that does not match the request
    StateMismatch,
    /// Redirect carried neither a code nor an error
    MissingCode,
    /// Timeout waiting for callback
    Timeout,
}

impl AuthError {
    /// OAuth-style error code reported through a token callback.
    pub fn error_code(&self) -> &str {
        match self {
            AuthError::Denied(code) => code,
            AuthError::Timeout => "timeout",
            AuthError::StateMismatch => "state_mismatch",
            AuthError::MissingCode => "missing_code",
            AuthError::IoError(_) | AuthError::HttpError(_) | AuthError::CacheError(..) => {
                "loopback_failed"
            }
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::IoError(e) => write!(f, "I/O error: {}", e),
            AuthError::HttpError(e) => write!(f, "HTTP error: {}", e),
            AuthError::CacheError(path, e) => {
                write!(f, "Token cache '{}': {}", path.display(), e)
            }
            AuthError::Denied(code) => write!(f, "Authorization denied: {}", code),
            AuthError::StateMismatch => write!(f, "Authorization response state mismatch"),
            AuthError::MissingCode => write!(f, "Authorization response carried no code"),
            AuthError::Timeout => write!(f, "Timed out waiting for authentication"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<io::Error> for AuthError {
    fn from(e: io::Error) -> Self {
        AuthError::IoError(e)
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::HttpError(e.to_string())
    }
}
