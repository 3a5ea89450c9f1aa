use serde::{Deserialize, Serialize, Serializer};
use sheetfit_core::session::{DEFAULT_CLIENT_LOAD_TIMEOUT, DEFAULT_DISCOVERY_DOC, DEFAULT_SCOPE};
use sheetfit_core::SessionConfig;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DOCUMENT_TITLE: &str = "sheetfit";

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Replaces the value when `file` or `env` provides one; env wins.
    fn layered(self, file: Option<T>, env: Option<T>) -> Self {
        match (env, file) {
            (Some(value), _) => Self::new(value, ConfigSource::Environment),
            (None, Some(value)) => Self::new(value, ConfigSource::File),
            (None, None) => self,
        }
    }
}

/// A value that is never printed in full.
#[derive(Debug, Clone, PartialEq)]
pub struct Secret(pub String);

impl Secret {
    /// Shows the first and last four characters of long secrets.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() > 8 {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        } else {
            "****".to_string()
        }
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.masked())
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// OAuth client id of the installed application
    pub client_id: ConfigValue<Option<String>>,
    /// OAuth client secret, needed by some client types for the code exchange
    pub client_secret: ConfigValue<Option<Secret>>,
    /// API key sent with every Google API call
    pub api_key: ConfigValue<Option<Secret>>,
    /// Discovery document of the Sheets API
    pub discovery_doc: ConfigValue<String>,
    /// Space-separated OAuth scopes
    pub scopes: ConfigValue<String>,
    /// Title of the backing spreadsheet
    pub document_title: ConfigValue<String>,
    /// Seconds allowed for loading the Drive client
    pub client_load_timeout: ConfigValue<u64>,
    /// Directory holding the token cache
    pub data_dir: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Google section of the config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct GoogleSection {
    client_id: Option<String>,
    client_secret: Option<String>,
    api_key: Option<String>,
    discovery_doc: Option<String>,
    scopes: Option<String>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    google: GoogleSection,
    document_title: Option<String>,
    client_load_timeout: Option<u64>,
    data_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |name| std::env::var(name).ok())
    }

    /// Same as `load`, reading environment variables through `env`.
    pub fn load_with_env(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let path = config_path.unwrap_or_else(Self::default_config_path);
        let mut config_file = None;
        let mut file = ConfigFile::default();

        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            file = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
            config_file = Some(path.clone());
        }

        // Resolve relative paths against config file's directory
        let file_data_dir = file.data_dir.map(|dir| {
            if dir.is_relative() {
                path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
            } else {
                dir
            }
        });

        let env_timeout = match env("SHEETFIT_CLIENT_LOAD_TIMEOUT") {
            Some(raw) => Some(
                raw.parse::<u64>()
                    .map_err(|_| ConfigError::InvalidValue("SHEETFIT_CLIENT_LOAD_TIMEOUT", raw))?,
            ),
            None => None,
        };

        Ok(Self {
            client_id: ConfigValue::new(None, ConfigSource::Default).layered(
                file.google.client_id.filter(|id| !id.is_empty()).map(Some),
                env("SHEETFIT_CLIENT_ID").map(Some),
            ),
            client_secret: ConfigValue::new(None, ConfigSource::Default).layered(
                file.google.client_secret.map(|s| Some(Secret(s))),
                env("SHEETFIT_CLIENT_SECRET").map(|s| Some(Secret(s))),
            ),
            api_key: ConfigValue::new(None, ConfigSource::Default).layered(
                file.google.api_key.map(|s| Some(Secret(s))),
                env("SHEETFIT_API_KEY").map(|s| Some(Secret(s))),
            ),
            discovery_doc: ConfigValue::new(DEFAULT_DISCOVERY_DOC.to_string(), ConfigSource::Default)
                .layered(file.google.discovery_doc, env("SHEETFIT_DISCOVERY_DOC")),
            scopes: ConfigValue::new(DEFAULT_SCOPE.to_string(), ConfigSource::Default)
                .layered(file.google.scopes, env("SHEETFIT_SCOPES")),
            document_title: ConfigValue::new(
                DEFAULT_DOCUMENT_TITLE.to_string(),
                ConfigSource::Default,
            )
            .layered(file.document_title, env("SHEETFIT_DOCUMENT_TITLE")),
            client_load_timeout: ConfigValue::new(
                DEFAULT_CLIENT_LOAD_TIMEOUT.as_secs(),
                ConfigSource::Default,
            )
            .layered(file.client_load_timeout, env_timeout),
            data_dir: ConfigValue::new(Self::default_data_dir(), ConfigSource::Default)
                .layered(file_data_dir, env("SHEETFIT_DATA_DIR").map(PathBuf::from)),
            config_file,
        })
    }

    /// Builds the session inputs; the client id is required.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let client_id = self
            .client_id
            .value
            .clone()
            .ok_or(ConfigError::MissingValue("google.client_id"))?;
        let api_key = self
            .api_key
            .value
            .as_ref()
            .map(|key| key.0.clone())
            .unwrap_or_default();

        Ok(SessionConfig::new(client_id, api_key)
            .with_scope(self.scopes.value.clone())
            .with_discovery_docs(vec![self.discovery_doc.value.clone()])
            .with_client_load_timeout(Duration::from_secs(self.client_load_timeout.value)))
    }

    /// Path of the cached access token.
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.value.join("token.yaml")
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/sheetfit/
    /// - macOS: ~/Library/Application Support/sheetfit/
    /// - Windows: %APPDATA%/sheetfit/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetfit")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/sheetfit/
    /// - macOS: ~/Library/Application Support/sheetfit/
    /// - Windows: %APPDATA%/sheetfit/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetfit")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(&'static str, String),
    MissingValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
            ConfigError::MissingValue(name) => {
                write!(
                    f,
                    "{} is not set. Run 'sheetfit config init' and edit the config file.",
                    name
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}
