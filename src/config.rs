//! Application-level configuration loading, including the storage backend selection.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the store looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/store.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TICTACTOE_STORE_CONFIG_PATH";
/// Environment variable overriding the MongoDB connection string.
const MONGO_URI_ENV: &str = "MONGO_URI";
/// Environment variable overriding the MongoDB database name.
const MONGO_DB_ENV: &str = "MONGO_DB";
const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
const DEFAULT_DATABASE: &str = "tictactoe";
const DEFAULT_CONNECT_ATTEMPTS: u32 = 10;

/// Storage backend to open at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// MongoDB server.
    #[default]
    Mongo,
    /// Process-local store, lost on exit.
    Memory,
}

impl BackendKind {
    /// Name as written in the configuration file.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Mongo => "mongo",
            BackendKind::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Selected backend.
    pub backend: BackendKind,
    /// MongoDB connection string.
    pub mongo_uri: String,
    /// Database holding the `users` and `games` collections.
    pub database: String,
    /// Pings sent to a freshly opened MongoDB client before the connection attempt fails.
    pub connect_attempts: u32,
}

impl AppConfig {
    /// Load the configuration from disk, then apply environment overrides.
    ///
    /// A missing or unreadable file falls back to the built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        backend = app_config.backend.as_str(),
                        "loaded store configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.apply_overrides(env::var(MONGO_URI_ENV).ok(), env::var(MONGO_DB_ENV).ok());
        config
    }

    fn apply_overrides(&mut self, uri: Option<String>, database: Option<String>) {
        if let Some(uri) = uri.filter(|value| !value.is_empty()) {
            self.mongo_uri = uri;
        }
        if let Some(database) = database.filter(|value| !value.is_empty()) {
            self.database = database;
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            mongo_uri: DEFAULT_MONGO_URI.to_owned(),
            database: DEFAULT_DATABASE.to_owned(),
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    backend: BackendKind,
    mongo_uri: Option<String>,
    database: Option<String>,
    connect_attempts: Option<u32>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            backend: value.backend,
            mongo_uri: value
                .mongo_uri
                .unwrap_or_else(|| DEFAULT_MONGO_URI.to_owned()),
            database: value.database.unwrap_or_else(|| DEFAULT_DATABASE.to_owned()),
            connect_attempts: value
                .connect_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(DEFAULT_CONNECT_ATTEMPTS),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
