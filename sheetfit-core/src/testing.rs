//! In-memory stand-ins for the API boundary, recording every call.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::api::{
    AccessToken, ApiClient, ApiError, AppendValuesRequest, AppendValuesResponse, ClientInit,
    GetValuesRequest, IdentityProvider, ScriptLoader, SheetsApi, SpreadsheetId, TokenCallback,
    TokenRequest, TokenResponse, ValueRange,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Script(String),
    Load(String, String),
    Init(ClientInit),
    SetToken(String),
    Find(String),
    Create(String),
    GetValues(GetValuesRequest),
    AppendValues(AppendValuesRequest),
}

/// Scripted script loader and API client.
///
/// Unscripted calls succeed: scripts load, `find_spreadsheet` finds nothing,
/// `create_spreadsheet` answers `created-id`, reads return no values.
#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<Call>>,
    failing_scripts: Mutex<Vec<String>>,
    load_error: Mutex<Option<ApiError>>,
    load_delay: Mutex<Option<Duration>>,
    init_error: Mutex<Option<ApiError>>,
    find_result: Mutex<Option<Result<Option<SpreadsheetId>, ApiError>>>,
    create_result: Mutex<Option<Result<SpreadsheetId, ApiError>>>,
    get_results: Mutex<VecDeque<Result<ValueRange, ApiError>>>,
    append_results: Mutex<VecDeque<Result<AppendValuesResponse, ApiError>>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_script(self, url: &str) -> Self {
        self.failing_scripts.lock().unwrap().push(url.to_string());
        self
    }

    pub fn fail_load(self, error: ApiError) -> Self {
        *self.load_error.lock().unwrap() = Some(error);
        self
    }

    pub fn delay_load(self, delay: Duration) -> Self {
        *self.load_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn fail_init(self, error: ApiError) -> Self {
        *self.init_error.lock().unwrap() = Some(error);
        self
    }

    pub fn find(self, result: Result<Option<SpreadsheetId>, ApiError>) -> Self {
        *self.find_result.lock().unwrap() = Some(result);
        self
    }

    pub fn create(self, result: Result<SpreadsheetId, ApiError>) -> Self {
        *self.create_result.lock().unwrap() = Some(result);
        self
    }

    pub fn push_get(&self, result: Result<ValueRange, ApiError>) {
        self.get_results.lock().unwrap().push_back(result);
    }

    pub fn push_append(&self, result: Result<AppendValuesResponse, ApiError>) {
        self.append_results.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ScriptLoader for MockApi {
    async fn load(&self, url: &str) -> Result<(), ApiError> {
        self.record(Call::Script(url.to_string()));
        let fails = self.failing_scripts.lock().unwrap().iter().any(|u| u == url);
        if fails {
            Err(ApiError::Http(format!("failed to load {}", url)))
        } else {
            Ok(())
        }
    }
}

impl SheetsApi for MockApi {
    async fn get_values(&self, request: &GetValuesRequest) -> Result<ValueRange, ApiError> {
        self.record(Call::GetValues(request.clone()));
        let next = self.get_results.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(ValueRange::default()))
    }

    async fn append_values(
        &self,
        request: &AppendValuesRequest,
    ) -> Result<AppendValuesResponse, ApiError> {
        self.record(Call::AppendValues(request.clone()));
        let next = self.append_results.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ApiError::Rejected("no append scripted".to_string())))
    }
}

impl ApiClient for MockApi {
    async fn load(&self, name: &str, version: &str) -> Result<(), ApiError> {
        self.record(Call::Load(name.to_string(), version.to_string()));
        let delay = *self.load_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let error = self.load_error.lock().unwrap().clone();
        error.map_or(Ok(()), Err)
    }

    async fn init(&self, init: &ClientInit) -> Result<(), ApiError> {
        self.record(Call::Init(init.clone()));
        let error = self.init_error.lock().unwrap().clone();
        error.map_or(Ok(()), Err)
    }

    fn set_access_token(&self, token: AccessToken) {
        self.record(Call::SetToken(token.token));
    }

    async fn find_spreadsheet(&self, title: &str) -> Result<Option<SpreadsheetId>, ApiError> {
        self.record(Call::Find(title.to_string()));
        let result = self.find_result.lock().unwrap().clone();
        result.unwrap_or(Ok(None))
    }

    async fn create_spreadsheet(&self, title: &str) -> Result<SpreadsheetId, ApiError> {
        self.record(Call::Create(title.to_string()));
        let result = self.create_result.lock().unwrap().clone();
        result.unwrap_or_else(|| Ok(SpreadsheetId::new("created-id")))
    }
}

/// Identity provider answering from a fixed response.
///
/// `None` drops the callback without answering. The answer is delivered on a
/// spawned task so the caller sees it arrive asynchronously.
pub struct MockIdentity {
    response: Option<TokenResponse>,
    requests: Mutex<Vec<TokenRequest>>,
}

impl MockIdentity {
    pub fn answering(response: TokenResponse) -> Self {
        Self {
            response: Some(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn silent() -> Self {
        Self {
            response: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<TokenRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl IdentityProvider for MockIdentity {
    fn request_access_token(&self, request: TokenRequest, callback: TokenCallback) {
        self.requests.lock().unwrap().push(request);
        if let Some(response) = self.response.clone() {
            tokio::spawn(async move { callback(response) });
        }
    }
}
