pub mod schema;

pub use schema::{BotConfig, Config, SearchConfig, MAX_SEARCH_LIMIT};

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("could not determine a home directory for the default config")]
    NoHomeDirectory,
}

/// Default config location, e.g. `~/.config/memoria/config.toml` on Linux.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    directories::ProjectDirs::from("", "", "memoria")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .ok_or(ConfigError::NoHomeDirectory)
}

impl Config {
    /// Load from `explicit`, or from the default location when it exists.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let path = default_config_path()?;
                if !path.exists() {
                    tracing::debug!(path = %path.display(), "No config file, using defaults");
                    return Ok(Self::default());
                }
                path
            }
        };
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}
