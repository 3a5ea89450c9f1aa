use clap::{Args, Subcommand};
use std::path::Path;

use super::{CommandError, OutputFormat};
use crate::config::{Config, ConfigValue, Secret};

const CONFIG_TEMPLATE: &str = r#"# SheetFit configuration
#
# Values here can be overridden with SHEETFIT_* environment variables.

google:
  # OAuth client id of a "Desktop app" client (required)
  client_id: ""
  # Client secret, if the OAuth client has one
  # client_secret: ""
  # API key sent with every request
  # api_key: ""
  # discovery_doc: "https://sheets.googleapis.com/$discovery/rest?version=v4"
  # scopes: "https://www.googleapis.com/auth/drive.file"

# Title of the spreadsheet holding your data; created on first use
# document_title: "sheetfit"

# Seconds to wait for Google API clients to load
# client_load_timeout: 10

# Where the access token is cached (relative to this file)
# data_dir: "data"
"#;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Write a config file template
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    /// Runs without a preloaded config so `init` can replace a broken file.
    pub fn run(&self, config_path: Option<&Path>) -> Result<(), CommandError> {
        let path = config_path
            .map(Path::to_path_buf)
            .unwrap_or_else(Config::default_config_path);

        match &self.command {
            ConfigSubcommand::Show { format } => {
                let config = Config::load(Some(path.clone()))?;
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
                    OutputFormat::Text => print!("{}", format_config(&config, &path)),
                }
                Ok(())
            }
            ConfigSubcommand::Init { force } => {
                write_template(&path, *force)?;
                println!("Wrote config template to {}", path.display());
                Ok(())
            }
        }
    }
}

fn write_template(path: &Path, force: bool) -> Result<(), CommandError> {
    if path.exists() && !force {
        return Err(CommandError::InvalidInput(format!(
            "Config file already exists: {} (use --force to overwrite)",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, CONFIG_TEMPLATE)?;
    Ok(())
}

/// Renders every value with its source. `searched` is the file that was
/// looked for, reported when it does not exist.
fn format_config(config: &Config, searched: &Path) -> String {
    let mut out = String::from("Configuration\n=============\n\n");

    match &config.config_file {
        Some(path) => out.push_str(&format!("Config file: {}\n\n", path.display())),
        None => out.push_str(&format!(
            "Config file: {} (not found)\n\n",
            searched.display()
        )),
    }

    let unset = || "(not set)".to_string();
    let secret = |value: &ConfigValue<Option<Secret>>| {
        value.value.as_ref().map(Secret::masked).unwrap_or_else(unset)
    };

    let entries = [
        (
            "google.client_id",
            config.client_id.value.clone().unwrap_or_else(unset),
            &config.client_id.source,
        ),
        (
            "google.client_secret",
            secret(&config.client_secret),
            &config.client_secret.source,
        ),
        (
            "google.api_key",
            secret(&config.api_key),
            &config.api_key.source,
        ),
        (
            "google.discovery_doc",
            config.discovery_doc.value.clone(),
            &config.discovery_doc.source,
        ),
        (
            "google.scopes",
            config.scopes.value.clone(),
            &config.scopes.source,
        ),
        (
            "document_title",
            config.document_title.value.clone(),
            &config.document_title.source,
        ),
        (
            "client_load_timeout",
            format!("{}s", config.client_load_timeout.value),
            &config.client_load_timeout.source,
        ),
        (
            "data_dir",
            config.data_dir.value.display().to_string(),
            &config.data_dir.source,
        ),
    ];

    let blocks: Vec<String> = entries
        .iter()
        .map(|(key, value, source)| format!("{}: {}\n  source: {}\n", key, value, source))
        .collect();
    out.push_str(&blocks.join("\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_writes_loadable_template() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.yaml");

        write_template(&path, false).unwrap();

        let config = Config::load_with_env(Some(path.clone()), |_| None).unwrap();
        assert_eq!(config.config_file, Some(path));
        assert!(config.client_id.value.is_none());
        assert_eq!(config.document_title.value, "sheetfit");
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "document_title: mine\n").unwrap();

        assert!(write_template(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "document_title: mine\n");

        write_template(&path, true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("# SheetFit"));
    }

    #[test]
    fn test_show_masks_secrets() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("none.yaml");
        let config = Config::load_with_env(Some(path.clone()), |name| match name {
            "SHEETFIT_API_KEY" => Some("AIzaSyExampleKey".to_string()),
            _ => None,
        })
        .unwrap();

        let text = format_config(&config, &path);
        assert!(text.contains("google.api_key: AIza...eKey\n  source: environment"));
        assert!(text.contains("google.client_id: (not set)\n  source: default"));
        assert!(!text.contains("AIzaSyExampleKey"));
    }

    #[test]
    fn test_show_reports_requested_missing_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("elsewhere").join("sheetfit.yaml");
        let config = Config::load_with_env(Some(path.clone()), |_| None).unwrap();

        let text = format_config(&config, &path);

        assert!(text.contains(&format!("Config file: {} (not found)", path.display())));
        assert!(!text.contains(&Config::default_config_path().display().to_string()));
    }

    #[test]
    fn test_init_force_repairs_unparseable_config() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "google: [\n").unwrap();
        assert!(Config::load_with_env(Some(path.clone()), |_| None).is_err());

        let init = ConfigCommand {
            command: ConfigSubcommand::Init { force: true },
        };
        init.run(Some(&path)).unwrap();

        let config = Config::load_with_env(Some(path.clone()), |_| None).unwrap();
        assert_eq!(config.config_file, Some(path));
    }
}
