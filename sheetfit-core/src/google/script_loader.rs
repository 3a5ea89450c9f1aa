use tracing::debug;

use super::check;
use crate::api::{ApiError, ScriptLoader};

/// Fetches bootstrap resources over HTTP.
///
/// A resource counts as loaded once it answers with a 2xx status and its
/// body has been read in full.
#[derive(Debug, Clone, Default)]
pub struct HttpScriptLoader {
    http: reqwest::Client,
}

impl HttpScriptLoader {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl ScriptLoader for HttpScriptLoader {
    async fn load(&self, url: &str) -> Result<(), ApiError> {
        let response = check(self.http.get(url).send().await?).await?;
        let body = response.bytes().await?;
        debug!("Loaded {} ({} bytes)", url, body.len());
        Ok(())
    }
}
