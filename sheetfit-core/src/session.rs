//! Remote document session: client bootstrap, authentication, and the
//! backing spreadsheet.
//!
//! A session moves through
//! `Uninitialized -> ScriptsLoading -> ClientReady -> TokenRequested -> Authenticated`
//! and, independently, `Unresolved -> Resolving -> Resolved`. A failed step
//! returns the session to the phase it was in before the step started.

use std::time::Duration;

use futures::future::try_join_all;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::api::{
    ApiClient, ApiError, ClientInit, IdentityProvider, ScriptLoader, SpreadsheetId, TokenRequest,
};

/// Sheets API discovery document.
pub const DEFAULT_DISCOVERY_DOC: &str = "https://sheets.googleapis.com/$discovery/rest?version=v4";

/// Scope limited to files created by the application.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/drive.file";

/// Bootstrap resources fetched before the API client is loaded.
pub const DEFAULT_SCRIPT_URLS: [&str; 2] = [
    "https://accounts.google.com/.well-known/openid-configuration",
    DEFAULT_DISCOVERY_DOC,
];

pub const DEFAULT_CLIENT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Static inputs of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub client_id: String,
    pub api_key: String,
    pub scope: String,
    pub discovery_docs: Vec<String>,
    pub script_urls: Vec<String>,
    pub sub_client_name: String,
    pub sub_client_version: String,
    pub client_load_timeout: Duration,
    /// Consent prompt passed with every token request.
    pub prompt: String,
}

impl SessionConfig {
    pub fn new(client_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            api_key: api_key.into(),
            scope: DEFAULT_SCOPE.to_string(),
            discovery_docs: vec![DEFAULT_DISCOVERY_DOC.to_string()],
            script_urls: DEFAULT_SCRIPT_URLS.iter().map(|u| u.to_string()).collect(),
            sub_client_name: "drive".to_string(),
            sub_client_version: "v3".to_string(),
            client_load_timeout: DEFAULT_CLIENT_LOAD_TIMEOUT,
            prompt: String::new(),
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_discovery_docs(mut self, docs: Vec<String>) -> Self {
        self.discovery_docs = docs;
        self
    }

    pub fn with_script_urls(mut self, urls: Vec<String>) -> Self {
        self.script_urls = urls;
        self
    }

    pub fn with_client_load_timeout(mut self, timeout: Duration) -> Self {
        self.client_load_timeout = timeout;
        self
    }
}

/// Progress of client bootstrap and authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClientPhase {
    Uninitialized,
    ScriptsLoading,
    ClientReady,
    TokenRequested,
    Authenticated,
}

/// Progress of locating the backing spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentPhase {
    Unresolved,
    Resolving,
    Resolved(SpreadsheetId),
}

/// Snapshot of a session's externally visible state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub ready: bool,
    pub authenticated: bool,
    pub document_id: Option<SpreadsheetId>,
}

/// Errors from session operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Failed to load script {url}: {source}")]
    ScriptLoad { url: String, source: ApiError },

    #[error("Failed to load {name} client: {source}")]
    SubClientLoad { name: String, source: ApiError },

    #[error("Loading {name} client timed out after {timeout:?}")]
    SubClientTimeout { name: String, timeout: Duration },

    #[error("Client is not initialized")]
    NotReady,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Token request rejected: {error}{}", detail(.description))]
    TokenRejected {
        error: String,
        description: Option<String>,
    },

    #[error("Token request ended without an answer")]
    TokenCallbackDropped,

    #[error("Failed to initialize client: {0}")]
    ClientInit(ApiError),

    #[error("Failed to look up spreadsheet: {0}")]
    LocateDocument(ApiError),

    #[error("Failed to create spreadsheet: {0}")]
    CreateDocument(ApiError),
}

fn detail(description: &Option<String>) -> String {
    description
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}

/// Owns the collaborators needed to reach the backing spreadsheet.
pub struct Session<L, C, I> {
    config: SessionConfig,
    loader: L,
    client: C,
    identity: I,
    client_phase: ClientPhase,
    document_phase: DocumentPhase,
}

impl<L, C, I> Session<L, C, I>
where
    L: ScriptLoader,
    C: ApiClient,
    I: IdentityProvider,
{
    pub fn new(config: SessionConfig, loader: L, client: C, identity: I) -> Self {
        Self {
            config,
            loader,
            client,
            identity,
            client_phase: ClientPhase::Uninitialized,
            document_phase: DocumentPhase::Unresolved,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn client_phase(&self) -> ClientPhase {
        self.client_phase
    }

    pub fn document_phase(&self) -> &DocumentPhase {
        &self.document_phase
    }

    pub fn document_id(&self) -> Option<&SpreadsheetId> {
        match &self.document_phase {
            DocumentPhase::Resolved(id) => Some(id),
            _ => None,
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            ready: self.client_phase >= ClientPhase::ClientReady,
            authenticated: self.client_phase == ClientPhase::Authenticated,
            document_id: self.document_id().cloned(),
        }
    }

    /// Loads every bootstrap script, then the sub-client.
    ///
    /// The sub-client load is bounded by the configured timeout and is not
    /// attempted if any script fails. Does nothing once the client is ready.
    pub async fn initialize(&mut self) -> Result<(), SessionError> {
        if self.client_phase >= ClientPhase::ClientReady {
            return Ok(());
        }

        let previous = self.client_phase;
        self.client_phase = ClientPhase::ScriptsLoading;

        match self.load_client().await {
            Ok(()) => {
                self.client_phase = ClientPhase::ClientReady;
                info!("google is loaded");
                Ok(())
            }
            Err(e) => {
                self.client_phase = previous;
                error!("{}", e);
                Err(e)
            }
        }
    }

    async fn load_client(&self) -> Result<(), SessionError> {
        let loads = self.config.script_urls.iter().map(|url| async move {
            debug!("Loading script {}", url);
            self.loader
                .load(url)
                .await
                .map_err(|source| SessionError::ScriptLoad {
                    url: url.clone(),
                    source,
                })
        });
        try_join_all(loads).await?;

        let name = format!(
            "{} {}",
            self.config.sub_client_name, self.config.sub_client_version
        );
        let load = self
            .client
            .load(&self.config.sub_client_name, &self.config.sub_client_version);

        match tokio::time::timeout(self.config.client_load_timeout, load).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(SessionError::SubClientLoad { name, source }),
            Err(_) => Err(SessionError::SubClientTimeout {
                name,
                timeout: self.config.client_load_timeout,
            }),
        }
    }

    /// Requests an access token and configures the API client.
    ///
    /// The token answer arrives through the identity provider's callback
    /// while the client applies its API key and discovery documents. Both
    /// must succeed before the token is installed.
    pub async fn authenticate(&mut self) -> Result<(), SessionError> {
        if self.client_phase < ClientPhase::ClientReady {
            let e = SessionError::NotReady;
            error!("{}", e);
            return Err(e);
        }

        let previous = self.client_phase;
        self.client_phase = ClientPhase::TokenRequested;

        match self.request_token().await {
            Ok(()) => {
                self.client_phase = ClientPhase::Authenticated;
                info!("authenticated");
                Ok(())
            }
            Err(e) => {
                self.client_phase = previous;
                error!("{}", e);
                Err(e)
            }
        }
    }

    async fn request_token(&self) -> Result<(), SessionError> {
        let (tx, rx) = oneshot::channel();
        let request = TokenRequest {
            client_id: self.config.client_id.clone(),
            scope: self.config.scope.clone(),
            prompt: self.config.prompt.clone(),
        };
        self.identity.request_access_token(
            request,
            Box::new(move |response| {
                let _ = tx.send(response);
            }),
        );

        let init = ClientInit {
            api_key: self.config.api_key.clone(),
            discovery_docs: self.config.discovery_docs.clone(),
        };
        let (answer, init_result) = tokio::join!(rx, self.client.init(&init));

        let response = answer.map_err(|_| SessionError::TokenCallbackDropped)?;
        let token = response
            .into_access_token()
            .map_err(|(error, description)| SessionError::TokenRejected { error, description })?;
        init_result.map_err(SessionError::ClientInit)?;

        self.client.set_access_token(token);
        Ok(())
    }

    /// Finds the spreadsheet named `title`, creating it when absent.
    pub async fn resolve_document(&mut self, title: &str) -> Result<SpreadsheetId, SessionError> {
        if self.client_phase != ClientPhase::Authenticated {
            let e = SessionError::NotAuthenticated;
            error!("{}", e);
            return Err(e);
        }

        let previous = std::mem::replace(&mut self.document_phase, DocumentPhase::Resolving);

        match self.locate_or_create(title).await {
            Ok(id) => {
                self.document_phase = DocumentPhase::Resolved(id.clone());
                Ok(id)
            }
            Err(e) => {
                self.document_phase = previous;
                error!("{}", e);
                Err(e)
            }
        }
    }

    async fn locate_or_create(&self, title: &str) -> Result<SpreadsheetId, SessionError> {
        let found = self
            .client
            .find_spreadsheet(title)
            .await
            .map_err(SessionError::LocateDocument)?;

        if let Some(id) = found {
            info!("Using spreadsheet '{}' ({})", title, id);
            return Ok(id);
        }

        let id = self
            .client
            .create_spreadsheet(title)
            .await
            .map_err(SessionError::CreateDocument)?;
        info!("Created spreadsheet '{}' ({})", title, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TokenResponse;
    use crate::testing::{Call, MockApi, MockIdentity};
    use std::sync::Arc;

    type TestSession = Session<Arc<MockApi>, Arc<MockApi>, Arc<MockIdentity>>;

    fn config() -> SessionConfig {
        SessionConfig::new("client-id", "api-key")
            .with_script_urls(vec!["https://one.test/a".to_string(), "https://two.test/b".to_string()])
    }

    fn session(api: MockApi, identity: MockIdentity) -> (TestSession, Arc<MockApi>, Arc<MockIdentity>) {
        let api = Arc::new(api);
        let identity = Arc::new(identity);
        let session = Session::new(config(), api.clone(), api.clone(), identity.clone());
        (session, api, identity)
    }

    fn granted() -> MockIdentity {
        MockIdentity::answering(TokenResponse::success("ya29.token", Some(3599)))
    }

    async fn authenticated(api: MockApi) -> (TestSession, Arc<MockApi>) {
        let (mut session, api, _) = session(api, granted());
        session.initialize().await.unwrap();
        session.authenticate().await.unwrap();
        (session, api)
    }

    #[test]
    fn test_default_config() {
        let config = SessionConfig::new("id", "key");
        assert_eq!(config.scope, DEFAULT_SCOPE);
        assert_eq!(config.discovery_docs, vec![DEFAULT_DISCOVERY_DOC.to_string()]);
        assert_eq!(config.sub_client_name, "drive");
        assert_eq!(config.sub_client_version, "v3");
        assert_eq!(config.client_load_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_new_session_state() {
        let (session, _, _) = session(MockApi::new(), granted());
        assert_eq!(
            session.state(),
            SessionState {
                ready: false,
                authenticated: false,
                document_id: None
            }
        );
    }

    #[tokio::test]
    async fn test_initialize_loads_scripts_then_client() {
        let (mut session, api, _) = session(MockApi::new(), granted());

        session.initialize().await.unwrap();

        assert!(session.state().ready);
        assert_eq!(
            api.calls(),
            vec![
                Call::Script("https://one.test/a".to_string()),
                Call::Script("https://two.test/b".to_string()),
                Call::Load("drive".to_string(), "v3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_initialize_twice_is_noop() {
        let (mut session, api, _) = session(MockApi::new(), granted());

        session.initialize().await.unwrap();
        session.initialize().await.unwrap();

        assert_eq!(api.count(|c| matches!(c, Call::Load(..))), 1);
    }

    #[tokio::test]
    async fn test_initialize_script_failure_skips_client_load() {
        let (mut session, api, _) =
            session(MockApi::new().fail_script("https://two.test/b"), granted());

        let err = session.initialize().await.unwrap_err();

        assert_eq!(
            err,
            SessionError::ScriptLoad {
                url: "https://two.test/b".to_string(),
                source: ApiError::Http("failed to load https://two.test/b".to_string()),
            }
        );
        assert!(!session.state().ready);
        assert_eq!(session.client_phase(), ClientPhase::Uninitialized);
        assert_eq!(api.count(|c| matches!(c, Call::Load(..))), 0);
    }

    #[tokio::test]
    async fn test_initialize_client_load_failure() {
        let (mut session, _, _) = session(
            MockApi::new().fail_load(ApiError::Rejected("boom".to_string())),
            granted(),
        );

        let err = session.initialize().await.unwrap_err();

        assert!(matches!(err, SessionError::SubClientLoad { .. }));
        assert!(!session.state().ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_client_load_times_out() {
        let (mut session, _, _) = session(
            MockApi::new().delay_load(Duration::from_secs(60)),
            granted(),
        );

        let err = session.initialize().await.unwrap_err();

        assert_eq!(
            err,
            SessionError::SubClientTimeout {
                name: "drive v3".to_string(),
                timeout: Duration::from_secs(10),
            }
        );
        assert!(!session.state().ready);
    }

    #[tokio::test]
    async fn test_authenticate_requires_ready_client() {
        let (mut session, _, identity) = session(MockApi::new(), granted());

        let err = session.authenticate().await.unwrap_err();

        assert_eq!(err, SessionError::NotReady);
        assert!(identity.requests().is_empty());
    }

    #[tokio::test]
    async fn test_authenticate_installs_token() {
        let (mut session, api, identity) = session(MockApi::new(), granted());
        session.initialize().await.unwrap();

        session.authenticate().await.unwrap();

        assert!(session.state().authenticated);
        assert_eq!(
            identity.requests(),
            vec![TokenRequest {
                client_id: "client-id".to_string(),
                scope: DEFAULT_SCOPE.to_string(),
                prompt: String::new(),
            }]
        );
        let calls = api.calls();
        assert!(calls.contains(&Call::Init(ClientInit {
            api_key: "api-key".to_string(),
            discovery_docs: vec![DEFAULT_DISCOVERY_DOC.to_string()],
        })));
        assert!(calls.contains(&Call::SetToken("ya29.token".to_string())));
    }

    #[tokio::test]
    async fn test_authenticate_token_error() {
        let (mut session, api, _) = session(
            MockApi::new(),
            MockIdentity::answering(TokenResponse::failure("access_denied", None)),
        );
        session.initialize().await.unwrap();

        let err = session.authenticate().await.unwrap_err();

        assert_eq!(
            err,
            SessionError::TokenRejected {
                error: "access_denied".to_string(),
                description: None,
            }
        );
        assert!(!session.state().authenticated);
        assert!(session.state().ready);
        assert_eq!(api.count(|c| matches!(c, Call::SetToken(_))), 0);
    }

    #[tokio::test]
    async fn test_authenticate_dropped_callback() {
        let (mut session, _, _) = session(MockApi::new(), MockIdentity::silent());
        session.initialize().await.unwrap();

        let err = session.authenticate().await.unwrap_err();

        assert_eq!(err, SessionError::TokenCallbackDropped);
        assert_eq!(session.client_phase(), ClientPhase::ClientReady);
    }

    #[tokio::test]
    async fn test_authenticate_client_init_failure() {
        let (mut session, api, _) = session(
            MockApi::new().fail_init(ApiError::Rejected("bad key".to_string())),
            granted(),
        );
        session.initialize().await.unwrap();

        let err = session.authenticate().await.unwrap_err();

        assert_eq!(err, SessionError::ClientInit(ApiError::Rejected("bad key".to_string())));
        assert!(!session.state().authenticated);
        assert_eq!(api.count(|c| matches!(c, Call::SetToken(_))), 0);
    }

    #[tokio::test]
    async fn test_resolve_document_requires_authentication() {
        let (mut session, api, _) = session(MockApi::new(), granted());
        session.initialize().await.unwrap();

        let err = session.resolve_document("sheetfit").await.unwrap_err();

        assert_eq!(err, SessionError::NotAuthenticated);
        assert_eq!(api.count(|c| matches!(c, Call::Find(_))), 0);
    }

    #[tokio::test]
    async fn test_resolve_document_uses_existing() {
        let (mut session, api) =
            authenticated(MockApi::new().find(Ok(Some(SpreadsheetId::new("existing-id"))))).await;

        let id = session.resolve_document("sheetfit").await.unwrap();

        assert_eq!(id, SpreadsheetId::new("existing-id"));
        assert_eq!(session.document_id(), Some(&id));
        assert_eq!(api.count(|c| *c == Call::Find("sheetfit".to_string())), 1);
        assert_eq!(api.count(|c| matches!(c, Call::Create(_))), 0);
    }

    #[tokio::test]
    async fn test_resolve_document_creates_missing() {
        let (mut session, api) = authenticated(MockApi::new()).await;

        let id = session.resolve_document("sheetfit").await.unwrap();

        assert_eq!(id, SpreadsheetId::new("created-id"));
        assert_eq!(session.state().document_id, Some(id));
        assert_eq!(api.count(|c| matches!(c, Call::Find(_))), 1);
        assert_eq!(api.count(|c| *c == Call::Create("sheetfit".to_string())), 1);
    }

    #[tokio::test]
    async fn test_resolve_document_lookup_failure() {
        let (mut session, api) = authenticated(
            MockApi::new().find(Err(ApiError::Status {
                status: 403,
                message: "forbidden".to_string(),
            })),
        )
        .await;

        let err = session.resolve_document("sheetfit").await.unwrap_err();

        assert!(matches!(err, SessionError::LocateDocument(_)));
        assert_eq!(session.document_phase(), &DocumentPhase::Unresolved);
        assert_eq!(api.count(|c| matches!(c, Call::Create(_))), 0);
    }

    #[tokio::test]
    async fn test_resolve_document_create_failure() {
        let (mut session, _) =
            authenticated(MockApi::new().create(Err(ApiError::Rejected("quota".to_string())))).await;

        let err = session.resolve_document("sheetfit").await.unwrap_err();

        assert!(matches!(err, SessionError::CreateDocument(_)));
        assert_eq!(session.document_id(), None);
    }
}
