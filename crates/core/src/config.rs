//! Application configuration: defaults, `config.toml`, then `WORDCARDS__*` env vars.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{deck::CsvOptions, models::CardLayout};

/// Directory name under the platform config/data roots.
pub const APP_DIR: &str = "wordcards";
/// Name of the configuration file inside [`config_dir`].
pub const CONFIG_FILE: &str = "config.toml";
/// Prefix for environment overrides, e.g. `WORDCARDS__CSV__DELIMITER=;`.
pub const ENV_PREFIX: &str = "WORDCARDS";

const DEFAULT_CONFIG: &str = r#"# wordcards configuration

# Deck opened when no path is given on the command line.
# deck_path = "/home/me/words.csv"

# Reopen each deck at the card that was on screen when it was closed.
resume_position = true

# Directory for wordcards.log. Defaults to the platform data directory.
# log_dir = "/tmp/wordcards-logs"

[csv]
delimiter = ","
has_headers = true

[layout]
# Column (0-based) shown on the front of each card.
term_column = 0
# Columns revealed by the detail view. Omit to show every other column.
# detail_columns = [1, 2]
# Column holding a group such as a genre. Press t to step through groups;
# a/d then stay inside the active group.
# group_column = 2
"#;

/// Settings shared by the core and the terminal UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Deck used when none is given on the command line.
    pub deck_path: Option<PathBuf>,
    /// Reopen decks at the last viewed card.
    pub resume_position: bool,
    /// Directory receiving the log file.
    pub log_dir: Option<PathBuf>,
    /// CSV dialect of deck files.
    pub csv: CsvOptions,
    /// Column roles within each row.
    pub layout: CardLayout,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            deck_path: None,
            resume_position: true,
            log_dir: None,
            csv: CsvOptions::default(),
            layout: CardLayout::default(),
        }
    }
}

impl AppConfig {
    /// Load from the default location plus environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(config_path())
    }

    /// Load from `path` (optional on disk) plus environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_env(path.as_ref(), ENV_PREFIX)
    }

    fn load_with_env(path: &Path, env_prefix: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("layout.detail_columns"),
            )
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = settings
            .try_deserialize()
            .with_context(|| format!("invalid config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the CSV layer cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.csv.delimiter_byte().is_none() {
            bail!(
                "csv.delimiter must be a single ASCII character other than a quote or newline, got {:?}",
                self.csv.delimiter
            );
        }
        if self.layout.group_column == Some(self.layout.term_column) {
            bail!("layout.group_column must differ from layout.term_column");
        }
        Ok(())
    }

    /// Directory for the log file.
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("logs")
        })
    }
}

/// `~/.config/wordcards` (or the platform equivalent).
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Full path of the configuration file.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// Write a commented default config on first run.
pub fn ensure_default_config() -> Result<()> {
    ensure_default_config_at(config_path())
}

/// Write the default config to `path` unless something is already there.
pub fn ensure_default_config_at(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))?;
    info!(path = %path.display(), "Default config written");
    Ok(())
}
