//! Layered configuration: defaults, `waypoint.toml`, `.env`, environment

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use waypoint_server::ServerConfig;
use waypoint_traversal::TraversalConfig;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "waypoint.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {key}")]
    Env { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaypointConfig {
    pub server: ServerConfig,
    pub traversal: TraversalConfig,
}

impl WaypointConfig {
    /// Load from `path` if given (it must exist), else from `waypoint.toml`
    /// if present, then apply `.env` and `WAYPOINT_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", env_file.display());
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from `WAYPOINT_*` variables, looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(host) = var("WAYPOINT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("WAYPOINT_PORT") {
            self.server.port = parse_env("WAYPOINT_PORT", port)?;
        }
        if let Some(pacing) = var("WAYPOINT_PACING_MS") {
            self.traversal.pacing_ms = parse_env("WAYPOINT_PACING_MS", pacing)?;
        }
        if let Some(capacity) = var("WAYPOINT_CHANNEL_CAPACITY") {
            self.traversal.channel_capacity = parse_env("WAYPOINT_CHANNEL_CAPACITY", capacity)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { key, value })
}
