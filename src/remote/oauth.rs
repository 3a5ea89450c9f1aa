//! OAuth 2.0 installed-application flow with a loopback redirect.
//!
//! The browser is sent to Google's consent page; Google redirects back to a
//! short-lived local server carrying an authorization code, which is then
//! exchanged for an access token. PKCE binds the exchange to this process.

use axum::{extract::Query, response::Html, routing::get, Router};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sheetfit_core::{IdentityProvider, TokenCallback, TokenRequest, TokenResponse};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::AuthError;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// How long the browser has to come back with a code.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>SheetFit - Signed in</title></head>
<body>
<h1>Authentication complete</h1>
<p>You can close this window and return to the terminal.</p>
</body>
</html>"#;

/// Query parameters of the loopback redirect
#[derive(Debug, Default, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Identity provider running the loopback flow on a spawned task.
///
/// Must be used from within a tokio runtime.
#[derive(Clone)]
pub struct LoopbackIdentityProvider {
    http: reqwest::Client,
    client_secret: Option<String>,
}

impl LoopbackIdentityProvider {
    pub fn new(http: reqwest::Client, client_secret: Option<String>) -> Self {
        Self {
            http,
            client_secret,
        }
    }

    async fn run(&self, request: TokenRequest) -> Result<TokenResponse, AuthError> {
        let verifier = random_token();
        let state = random_token();

        let server = CallbackServer::start().await?;
        let redirect_uri = server.redirect_uri.clone();
        let auth_url = authorization_url(
            &request,
            &redirect_uri,
            &state,
            &pkce_challenge(&verifier),
        );

        eprintln!("\nOpen this URL in your browser to authenticate:\n");
        eprintln!("{}\n", auth_url);
        if open::that(&auth_url).is_err() {
            eprintln!("(Could not open browser automatically, please copy the URL above)");
        }
        eprintln!("Waiting for authorization (timeout: 5 minutes)");

        let params = server.wait(CALLBACK_TIMEOUT).await?;
        let code = match authorization_code(params, &state) {
            Ok(code) => code,
            Err(AuthError::Denied(error)) => return Ok(TokenResponse::failure(error, None)),
            Err(e) => return Err(e),
        };

        self.exchange(&request, &code, &redirect_uri, &verifier)
            .await
    }

    async fn exchange(
        &self,
        request: &TokenRequest,
        code: &str,
        redirect_uri: &str,
        verifier: &str,
    ) -> Result<TokenResponse, AuthError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", request.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("code_verifier", verifier),
        ];
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self.http.post(TOKEN_ENDPOINT).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        parse_token_body(status.as_u16(), &body)
    }
}

impl IdentityProvider for LoopbackIdentityProvider {
    fn request_access_token(&self, request: TokenRequest, callback: TokenCallback) {
        let provider = self.clone();
        tokio::spawn(async move {
            let response = match provider.run(request).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!("OAuth flow failed: {}", e);
                    TokenResponse::failure(e.error_code(), Some(e.to_string()))
                }
            };
            callback(response);
        });
    }
}

/// Local HTTP server receiving the OAuth redirect.
struct CallbackServer {
    redirect_uri: String,
    rx: oneshot::Receiver<CallbackParams>,
    handle: JoinHandle<()>,
}

impl CallbackServer {
    async fn start() -> Result<Self, AuthError> {
        let (tx, rx) = oneshot::channel::<CallbackParams>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);

        let handle = tokio::spawn(async move {
            let app = Router::new().route(
                "/callback",
                get(move |Query(params): Query<CallbackParams>| {
                    let tx = tx.clone();
                    async move {
                        let sender = tx.lock().ok().and_then(|mut guard| guard.take());
                        if let Some(sender) = sender {
                            let _ = sender.send(params);
                        }
                        Html(SUCCESS_PAGE)
                    }
                }),
            );

            if let Err(e) = axum::serve(listener, app).await {
                tracing::warn!("OAuth callback server stopped: {}", e);
            }
        });

        Ok(Self {
            redirect_uri,
            rx,
            handle,
        })
    }

    /// Waits for the first redirect, then shuts the server down.
    async fn wait(self, timeout: Duration) -> Result<CallbackParams, AuthError> {
        let result = tokio::time::timeout(timeout, self.rx).await;
        self.handle.abort();

        match result {
            Ok(Ok(params)) => Ok(params),
            Ok(Err(_)) | Err(_) => Err(AuthError::Timeout),
        }
    }
}

/// Returns 32 random bytes encoded as base64url (no padding).
fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 code challenge for a PKCE verifier.
fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn authorization_url(
    request: &TokenRequest,
    redirect_uri: &str,
    state: &str,
    challenge: &str,
) -> String {
    let mut params = vec![
        ("client_id", request.client_id.as_str()),
        ("redirect_uri", redirect_uri),
        ("response_type", "code"),
        ("scope", request.scope.as_str()),
        ("state", state),
        ("code_challenge", challenge),
        ("code_challenge_method", "S256"),
    ];
    if !request.prompt.is_empty() {
        params.push(("prompt", request.prompt.as_str()));
    }

    let query: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect();
    format!("{}?{}", AUTH_ENDPOINT, query.join("&"))
}

fn authorization_code(params: CallbackParams, expected_state: &str) -> Result<String, AuthError> {
    if let Some(error) = params.error {
        return Err(AuthError::Denied(error));
    }
    if params.state.as_deref() != Some(expected_state) {
        return Err(AuthError::StateMismatch);
    }
    params.code.ok_or(AuthError::MissingCode)
}

/// Reads the token endpoint's answer. Error answers carry `error` and
/// `error_description` fields and are passed through as such.
fn parse_token_body(status: u16, body: &str) -> Result<TokenResponse, AuthError> {
    match serde_json::from_str::<TokenResponse>(body) {
        Ok(response) if response.access_token.is_some() || response.error.is_some() => {
            Ok(response)
        }
        _ => Err(AuthError::HttpError(format!(
            "Token endpoint returned status {}: {}",
            status,
            body.trim()
        ))),
    }
}
