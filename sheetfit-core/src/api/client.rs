//! Boundary traits for the external collaborators of a session.
//!
//! Each method answers with a `Result`; implementations never panic on a
//! remote failure.

use std::future::Future;
use std::sync::Arc;

use super::error::ApiError;
use super::protocol::{
    AccessToken, AppendValuesRequest, AppendValuesResponse, ClientInit, GetValuesRequest,
    SpreadsheetId, TokenRequest, TokenResponse, ValueRange,
};

/// Loads a bootstrap resource (client script or discovery document).
pub trait ScriptLoader {
    fn load(&self, url: &str) -> impl Future<Output = Result<(), ApiError>> + Send;
}

/// Value read/append calls on the backing spreadsheet.
pub trait SheetsApi {
    fn get_values(
        &self,
        request: &GetValuesRequest,
    ) -> impl Future<Output = Result<ValueRange, ApiError>> + Send;

    fn append_values(
        &self,
        request: &AppendValuesRequest,
    ) -> impl Future<Output = Result<AppendValuesResponse, ApiError>> + Send;
}

/// The API client library driven by a session.
pub trait ApiClient: SheetsApi {
    /// Loads a named sub-client (e.g. `drive`, `v3`).
    fn load(&self, name: &str, version: &str)
        -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Applies the client's own configuration: API key and discovery documents.
    fn init(&self, init: &ClientInit) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Installs the bearer token used by subsequent calls.
    fn set_access_token(&self, token: AccessToken);

    /// Finds a spreadsheet whose name is exactly `title`.
    fn find_spreadsheet(
        &self,
        title: &str,
    ) -> impl Future<Output = Result<Option<SpreadsheetId>, ApiError>> + Send;

    /// Creates a spreadsheet named `title`.
    fn create_spreadsheet(
        &self,
        title: &str,
    ) -> impl Future<Output = Result<SpreadsheetId, ApiError>> + Send;
}

/// Receives the outcome of a token request.
pub type TokenCallback = Box<dyn FnOnce(TokenResponse) + Send + 'static>;

/// Issues OAuth access tokens.
///
/// `request_access_token` returns immediately; the outcome is delivered later
/// through `callback`, at most once. Dropping the callback without calling
/// it signals that no answer will come.
pub trait IdentityProvider {
    fn request_access_token(&self, request: TokenRequest, callback: TokenCallback);
}

impl<T: ScriptLoader> ScriptLoader for Arc<T> {
    fn load(&self, url: &str) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).load(url)
    }
}

impl<T: SheetsApi> SheetsApi for Arc<T> {
    fn get_values(
        &self,
        request: &GetValuesRequest,
    ) -> impl Future<Output = Result<ValueRange, ApiError>> + Send {
        (**self).get_values(request)
    }

    fn append_values(
        &self,
        request: &AppendValuesRequest,
    ) -> impl Future<Output = Result<AppendValuesResponse, ApiError>> + Send {
        (**self).append_values(request)
    }
}

impl<T: ApiClient> ApiClient for Arc<T> {
    fn load(&self, name: &str, version: &str)
        -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).load(name, version)
    }

    fn init(&self, init: &ClientInit) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).init(init)
    }

    fn set_access_token(&self, token: AccessToken) {
        (**self).set_access_token(token)
    }

    fn find_spreadsheet(
        &self,
        title: &str,
    ) -> impl Future<Output = Result<Option<SpreadsheetId>, ApiError>> + Send {
        (**self).find_spreadsheet(title)
    }

    fn create_spreadsheet(
        &self,
        title: &str,
    ) -> impl Future<Output = Result<SpreadsheetId, ApiError>> + Send {
        (**self).create_spreadsheet(title)
    }
}

impl<T: IdentityProvider> IdentityProvider for Arc<T> {
    fn request_access_token(&self, request: TokenRequest, callback: TokenCallback) {
        (**self).request_access_token(request, callback)
    }
}
