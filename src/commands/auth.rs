use clap::{Args, Subcommand};

use super::CommandError;
use crate::config::{Config, Secret};
use crate::remote::{open_session, CachedToken, TokenCache};

#[derive(Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    pub command: AuthSubcommand,
}

#[derive(Subcommand)]
pub enum AuthSubcommand {
    /// Sign in with Google in the browser
    Login,

    /// Forget the cached access token
    Logout,

    /// Show whether a usable token is cached
    Status,
}

impl AuthCommand {
    pub async fn run(&self, config: &Config) -> Result<(), CommandError> {
        match &self.command {
            AuthSubcommand::Login => login(config).await,
            AuthSubcommand::Logout => logout(config),
            AuthSubcommand::Status => status(config),
        }
    }
}

async fn login(config: &Config) -> Result<(), CommandError> {
    let mut session = open_session(config, false)?;
    session.initialize().await?;
    session.authenticate().await?;

    println!("Logged in.");
    println!("Token cached at {}", config.token_path().display());
    Ok(())
}

fn logout(config: &Config) -> Result<(), CommandError> {
    let cache = TokenCache::new(config.token_path());
    if cache.remove()? {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

fn status(config: &Config) -> Result<(), CommandError> {
    let token = TokenCache::new(config.token_path()).load()?;
    print!("{}", describe_status(config, token.as_ref()));
    Ok(())
}

fn describe_status(config: &Config, token: Option<&CachedToken>) -> String {
    if config.client_id.value.is_none() {
        return "Not configured: set google.client_id in the config file or SHEETFIT_CLIENT_ID\n"
            .to_string();
    }

    let token = match token {
        Some(token) => token,
        None => return "Not logged in. Run 'sheetfit auth login'.\n".to_string(),
    };

    if token.scope != config.scopes.value {
        return "Cached token was granted for a different scope. Run 'sheetfit auth login'.\n"
            .to_string();
    }
    if token.is_expired() {
        return "Token expired. Run 'sheetfit auth login'.\n".to_string();
    }

    let mut out = format!(
        "Logged in (token: {})\n",
        Secret(token.access_token.clone()).masked()
    );
    if let Some(secs) = token.expires_in() {
        out.push_str(&format!("Expires in {} minute(s)\n", secs / 60));
    }
    out
}
