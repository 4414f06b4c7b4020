//! Configuration management for ticketpin.
//!
//! The configuration is a small TOML file stored next to the executable. It
//! remembers the JIRA URL, the user and, if the user asked for it, the API
//! token, so the connection form can be prefilled on the next start.

mod credentials;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use credentials::Credentials;

/// File name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "ticketpin.toml";

/// Errors from loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this configuration.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The file could not be written.
    #[error("failed to write config file {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration could not be serialized.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// A value failed validation.
    #[error("invalid configuration: {0}")]
    ValidationError(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Persisted connection settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// The JIRA instance URL.
    #[serde(default)]
    pub jira_url: String,
    /// The account user, usually an email address.
    #[serde(default)]
    pub user: String,
    /// The API token, only present when the user chose to save it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl Config {
    /// Default location: `ticketpin.toml` beside the running executable.
    ///
    /// Falls back to the current directory if the executable path is unknown.
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }

    /// Load the configuration from `path`.
    ///
    /// A missing file yields the default (empty) configuration.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Config =
            toml::from_str(&contents).map_err(|source| ConfigError::ParseError {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load the configuration, falling back to defaults if it cannot be read.
    ///
    /// The load error is handed back so it can be shown to the user.
    pub fn load_or_default(path: &Path) -> (Self, Option<ConfigError>) {
        match Self::load_from(path) {
            Ok(config) => (config, None),
            Err(e) => {
                warn!(error = %e, "Config not loaded, starting with empty fields");
                (Self::default(), Some(e))
            }
        }
    }

    /// Save the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::WriteError {
                path: path.to_path_buf(),
                source,
            })?;
        }

        fs::write(path, contents).map_err(|source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Build the configuration to persist from the connection form.
    ///
    /// The token is only kept when `save_token` is set.
    pub fn from_form(jira_url: &str, user: &str, token: &str, save_token: bool) -> Self {
        Self {
            jira_url: jira_url.trim().to_string(),
            user: user.trim().to_string(),
            api_token: if save_token && !token.is_empty() {
                Some(token.to_string())
            } else {
                None
            },
        }
    }

    /// Whether a token was stored.
    pub fn has_token(&self) -> bool {
        self.api_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}
