use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{check, DISCOVERY_SERVICE_URL, SPREADSHEET_MIME_TYPE};
use crate::api::{
    AccessToken, ApiClient, ApiError, AppendValuesRequest, AppendValuesResponse, ClientInit,
    GetValuesRequest, SheetsApi, SpreadsheetId, ValueRange,
};
use crate::records::{ExerciseRecord, SheetRecord, WorkoutRecord};

const DRIVE: &str = "drive";
const SHEETS: &str = "sheets";

/// The subset of a discovery document needed to build request URLs.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DiscoveryDoc {
    name: String,
    root_url: String,
    #[serde(default)]
    service_path: String,
}

impl DiscoveryDoc {
    fn base_url(&self) -> String {
        format!("{}{}", self.root_url, self.service_path)
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedSpreadsheet {
    spreadsheet_id: SpreadsheetId,
}

#[derive(Debug, Default)]
struct ClientState {
    api_key: Option<String>,
    token: Option<AccessToken>,
    /// Base URL per loaded API name.
    apis: HashMap<String, String>,
}

/// Google API client speaking REST through `reqwest`.
///
/// APIs become callable once their discovery document is loaded, either by
/// name through `load` or by URL through `init`.
#[derive(Debug)]
pub struct GoogleApiClient {
    http: reqwest::Client,
    discovery_service: String,
    state: Mutex<ClientState>,
}

impl GoogleApiClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            discovery_service: DISCOVERY_SERVICE_URL.to_string(),
            state: Mutex::default(),
        }
    }

    /// Points discovery-by-name at another discovery service.
    pub fn with_discovery_service(mut self, url: impl Into<String>) -> Self {
        self.discovery_service = url.into();
        self
    }

    /// Returns the base URL of `api`, the bearer token and the API key.
    fn endpoint(&self, api: &str) -> Result<(String, Option<String>, Option<String>), ApiError> {
        let state = self
            .state
            .lock()
            .map_err(|_| ApiError::Http("client state poisoned".to_string()))?;
        let base = state
            .apis
            .get(api)
            .cloned()
            .ok_or_else(|| ApiError::NotLoaded(api.to_string()))?;
        let token = state.token.as_ref().map(|t| t.token.clone());

        Ok((base, token, state.api_key.clone()))
    }

    fn request(
        &self,
        method: reqwest::Method,
        api: &str,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, ApiError> {
        let (base, token, api_key) = self.endpoint(api)?;
        let url = format!("{}{}", base, path);
        debug!("{} {}", method, url);

        let mut builder = self.http.request(method, url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(key) = api_key {
            builder = builder.query(&[("key", key)]);
        }
        Ok(builder)
    }

    async fn fetch_discovery(&self, url: &str) -> Result<DiscoveryDoc, ApiError> {
        let response = check(self.http.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    fn register(&self, doc: &DiscoveryDoc) -> Result<(), ApiError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ApiError::Http("client state poisoned".to_string()))?;
        state.apis.insert(doc.name.clone(), doc.base_url());
        debug!("Registered {} at {}", doc.name, doc.base_url());
        Ok(())
    }
}

impl Default for GoogleApiClient {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

async fn read_json<T: DeserializeOwned>(builder: reqwest::RequestBuilder) -> Result<T, ApiError> {
    let response = check(builder.send().await?).await?;
    Ok(response.json().await?)
}

/// Drive search for a live spreadsheet named exactly `title`.
fn drive_query(title: &str) -> String {
    let escaped = title.replace('\\', "\\\\").replace('\'', "\\'");
    format!(
        "name = '{}' and mimeType = '{}' and trashed = false",
        escaped, SPREADSHEET_MIME_TYPE
    )
}

fn values_path(spreadsheet_id: &SpreadsheetId, range: &str) -> String {
    format!(
        "v4/spreadsheets/{}/values/{}",
        urlencoding::encode(spreadsheet_id.as_str()),
        urlencoding::encode(range)
    )
}

fn sheet_with_headers<R: SheetRecord>() -> Value {
    let cells: Vec<Value> = R::HEADERS
        .iter()
        .map(|header| json!({ "userEnteredValue": { "stringValue": header } }))
        .collect();

    json!({
        "properties": { "title": R::SHEET },
        "data": [{
            "startRow": 0,
            "startColumn": 0,
            "rowData": [{ "values": cells }]
        }]
    })
}

/// Body of a create call: the title plus one headed sheet per record kind.
fn new_spreadsheet(title: &str) -> Value {
    json!({
        "properties": { "title": title },
        "sheets": [
            sheet_with_headers::<ExerciseRecord>(),
            sheet_with_headers::<WorkoutRecord>()
        ]
    })
}

impl SheetsApi for GoogleApiClient {
    async fn get_values(&self, request: &GetValuesRequest) -> Result<ValueRange, ApiError> {
        let path = values_path(&request.spreadsheet_id, &request.range);
        let mut builder = self.request(reqwest::Method::GET, SHEETS, &path)?;

        if let Some(option) = request.value_render_option {
            builder = builder.query(&[("valueRenderOption", option.as_str())]);
        }
        if let Some(option) = request.date_time_render_option {
            builder = builder.query(&[("dateTimeRenderOption", option.as_str())]);
        }

        read_json(builder).await
    }

    async fn append_values(
        &self,
        request: &AppendValuesRequest,
    ) -> Result<AppendValuesResponse, ApiError> {
        let path = format!(
            "{}:append",
            values_path(&request.spreadsheet_id, &request.range)
        );
        let include = if request.include_values_in_response {
            "true"
        } else {
            "false"
        };

        let builder = self
            .request(reqwest::Method::POST, SHEETS, &path)?
            .query(&[
                ("insertDataOption", request.insert_data_option.as_str()),
                ("valueInputOption", request.value_input_option.as_str()),
                ("includeValuesInResponse", include),
                (
                    "responseValueRenderOption",
                    request.response_value_render_option.as_str(),
                ),
                (
                    "responseDateTimeRenderOption",
                    request.response_date_time_render_option.as_str(),
                ),
            ])
            .json(&ValueRange::from_rows(request.values.clone()));

        read_json(builder).await
    }
}

impl ApiClient for GoogleApiClient {
    async fn load(&self, name: &str, version: &str) -> Result<(), ApiError> {
        let url = format!("{}/{}/{}/rest", self.discovery_service, name, version);
        let doc = self.fetch_discovery(&url).await?;
        self.register(&doc)
    }

    async fn init(&self, init: &ClientInit) -> Result<(), ApiError> {
        {
            let mut state = self
                .state
                .lock()
                .map_err(|_| ApiError::Http("client state poisoned".to_string()))?;
            state.api_key = Some(init.api_key.clone()).filter(|key| !key.is_empty());
        }

        for url in &init.discovery_docs {
            let doc = self.fetch_discovery(url).await?;
            self.register(&doc)?;
        }
        Ok(())
    }

    fn set_access_token(&self, token: AccessToken) {
        if let Ok(mut state) = self.state.lock() {
            state.token = Some(token);
        }
    }

    async fn find_spreadsheet(&self, title: &str) -> Result<Option<SpreadsheetId>, ApiError> {
        let builder = self.request(reqwest::Method::GET, DRIVE, "files")?.query(&[
            ("q", drive_query(title)),
            ("fields", "files(id,name)".to_string()),
            ("pageSize", "1".to_string()),
            ("spaces", "drive".to_string()),
        ]);

        let list: FileList = read_json(builder).await?;
        Ok(list.files.into_iter().next().map(|f| SpreadsheetId::new(f.id)))
    }

    async fn create_spreadsheet(&self, title: &str) -> Result<SpreadsheetId, ApiError> {
        let builder = self
            .request(reqwest::Method::POST, SHEETS, "v4/spreadsheets")?
            .json(&new_spreadsheet(title));

        let created: CreatedSpreadsheet = read_json(builder).await?;
        Ok(created.spreadsheet_id)
    }
}
