use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sheetfit_core::{AccessToken, IdentityProvider, TokenCallback, TokenRequest, TokenResponse};
use std::path::{Path, PathBuf};

use super::AuthError;

/// Tokens this close to expiry are not reused.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Contents of the token cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub scope: String,
}

impl CachedToken {
    pub fn is_expired(&self) -> bool {
        self.access_token().expires_within(Duration::seconds(EXPIRY_MARGIN_SECS))
    }

    fn access_token(&self) -> AccessToken {
        AccessToken {
            token: self.access_token.clone(),
            expires_at: self.expires_at,
        }
    }

    /// Seconds left before expiry, if known.
    pub fn expires_in(&self) -> Option<i64> {
        self.expires_at
            .map(|at| (at - Utc::now()).num_seconds().max(0))
    }
}

/// A YAML file holding the most recent access token.
#[derive(Debug, Clone)]
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached token; a missing file means no token.
    pub fn load(&self) -> Result<Option<CachedToken>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let token = serde_yaml::from_str(&contents)
            .map_err(|e| AuthError::CacheError(self.path.clone(), e.to_string()))?;
        Ok(Some(token))
    }

    /// Returns the cached token when it was issued for `scope` and is not
    /// about to expire.
    pub fn load_valid(&self, scope: &str) -> Result<Option<CachedToken>, AuthError> {
        Ok(self
            .load()?
            .filter(|token| token.scope == scope && !token.is_expired()))
    }

    pub fn save(&self, token: &CachedToken) -> Result<(), AuthError> {
        let contents = serde_yaml::to_string(token)
            .map_err(|e| AuthError::CacheError(self.path.clone(), e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, contents)?;

        // Owner-only: the file holds a bearer token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Deletes the cache file. Returns false when there was none.
    pub fn remove(&self) -> Result<bool, AuthError> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)?;
        Ok(true)
    }
}

/// Identity provider that answers from the token cache when it can and
/// caches every token the wrapped provider grants.
pub struct CachedIdentityProvider<P> {
    cache: TokenCache,
    inner: P,
    reuse: bool,
}

impl<P: IdentityProvider> CachedIdentityProvider<P> {
    pub fn new(cache: TokenCache, inner: P) -> Self {
        Self {
            cache,
            inner,
            reuse: true,
        }
    }

    /// Always asks the wrapped provider, still caching its answer.
    pub fn without_reuse(mut self) -> Self {
        self.reuse = false;
        self
    }

    fn cached(&self, scope: &str) -> Option<CachedToken> {
        if !self.reuse {
            return None;
        }
        match self.cache.load_valid(scope) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Ignoring token cache: {}", e);
                None
            }
        }
    }
}

impl<P: IdentityProvider> IdentityProvider for CachedIdentityProvider<P> {
    fn request_access_token(&self, request: TokenRequest, callback: TokenCallback) {
        if let Some(token) = self.cached(&request.scope) {
            tracing::debug!("Using cached token from {}", self.cache.path().display());
            let expires_in = token.expires_in();
            callback(TokenResponse::success(token.access_token, expires_in));
            return;
        }

        let cache = self.cache.clone();
        let scope = request.scope.clone();
        self.inner.request_access_token(
            request,
            Box::new(move |response| {
                if let Ok(token) = response.clone().into_access_token() {
                    let entry = CachedToken {
                        access_token: token.token,
                        expires_at: token.expires_at,
                        scope,
                    };
                    if let Err(e) = cache.save(&entry) {
                        tracing::warn!("Failed to cache token: {}", e);
                    }
                }
                callback(response);
            }),
        );
    }
}
