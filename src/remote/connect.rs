use sheetfit_core::{GoogleApiClient, HttpScriptLoader, Session, SpreadsheetId};

use super::oauth::LoopbackIdentityProvider;
use super::token_cache::{CachedIdentityProvider, TokenCache};
use crate::commands::CommandError;
use crate::config::Config;

pub type GoogleSession =
    Session<HttpScriptLoader, GoogleApiClient, CachedIdentityProvider<LoopbackIdentityProvider>>;

/// An authenticated session and the spreadsheet it resolved.
pub struct Connection {
    pub session: GoogleSession,
    pub document: SpreadsheetId,
}

impl Connection {
    pub fn api(&self) -> &GoogleApiClient {
        self.session.client()
    }
}

/// Builds an uninitialized session from the configuration.
///
/// With `reuse_token` false the browser flow always runs, even when a valid
/// token is cached.
pub fn open_session(config: &Config, reuse_token: bool) -> Result<GoogleSession, CommandError> {
    let session_config = config.session_config()?;
    let http = reqwest::Client::new();

    let secret = config.client_secret.value.as_ref().map(|s| s.0.clone());
    let identity = CachedIdentityProvider::new(
        TokenCache::new(config.token_path()),
        LoopbackIdentityProvider::new(http.clone(), secret),
    );
    let identity = if reuse_token {
        identity
    } else {
        identity.without_reuse()
    };

    Ok(Session::new(
        session_config,
        HttpScriptLoader::new(http.clone()),
        GoogleApiClient::new(http),
        identity,
    ))
}

/// Initializes, authenticates and resolves the configured spreadsheet.
pub async fn connect(config: &Config) -> Result<Connection, CommandError> {
    let mut session = open_session(config, true)?;

    session.initialize().await?;
    session.authenticate().await?;
    let document = session
        .resolve_document(&config.document_title.value)
        .await?;

    Ok(Connection { session, document })
}
