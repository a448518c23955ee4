//! Per-user application directories and API-key persistence.
//!
//! Layout under the config directory:
//!
//! ```text
//! <config_dir>/
//!   config.json      {"api_key": "..."}
//!   logs/            one log file per run
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Application name used for directory names.
pub const APP_NAME: &str = "DocuPipe";

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "DOCUPIPE_CONFIG_DIR";

const CONFIG_FILE_NAME: &str = "config.json";
const LOGS_DIR_NAME: &str = "logs";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Home directory could not be determined
    #[error("Cannot determine home directory for {APP_NAME} configuration")]
    NoHomeDir,

    /// Attempted to save an empty key
    #[error("API key must not be empty")]
    EmptyApiKey,

    /// Filesystem failure on a config path
    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        /// What was being done
        action: &'static str,
        /// Path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Serialization failure while saving
    #[error("Failed to encode config: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Persisted client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub api_key: String,
}

/// Resolved per-user directories.
#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    /// Resolves the platform-conventional config directory.
    ///
    /// `DOCUPIPE_CONFIG_DIR` wins when set and non-empty.
    pub fn resolve() -> Result<Self, ConfigError> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(PathBuf::from(dir)));
        }

        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        let config_dir = if cfg!(target_os = "macos") {
            home.join("Library").join("Application Support").join(APP_NAME)
        } else if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .unwrap_or_else(|| home.join("AppData").join("Local"))
                .join(APP_NAME)
        } else {
            home.join(format!(".{}", APP_NAME.to_lowercase()))
        };

        Ok(Self::at(config_dir))
    }

    /// Uses an explicit directory.
    pub fn at<P: Into<PathBuf>>(config_dir: P) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.config_dir.join(LOGS_DIR_NAME)
    }
}

/// Reads and writes `config.json`.
#[derive(Debug, Clone)]
pub struct ApiKeyStore {
    path: PathBuf,
}

impl ApiKeyStore {
    pub fn new(paths: &AppPaths) -> Self {
        Self {
            path: paths.config_file(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored key, trimmed.
    ///
    /// A missing file yields an empty key. An unreadable or corrupt file is
    /// logged and also yields an empty key.
    pub fn load(&self) -> String {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return String::new(),
            Err(e) => {
                log::error!("Error loading config {}: {}", self.path.display(), e);
                return String::new();
            }
        };

        match serde_json::from_str::<AppConfig>(&raw) {
            Ok(config) => config.api_key.trim().to_string(),
            Err(e) => {
                log::error!("Error parsing config {}: {}", self.path.display(), e);
                String::new()
            }
        }
    }

    /// Saves a key, replacing the file.
    pub fn save(&self, api_key: &str) -> Result<(), ConfigError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                action: "create",
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let config = AppConfig {
            api_key: api_key.to_string(),
        };
        let encoded = serde_json::to_string(&config)?;
        std::fs::write(&self.path, encoded).map_err(|source| ConfigError::Io {
            action: "write",
            path: self.path.clone(),
            source,
        })?;

        log::info!("Saved API key to {}", self.path.display());
        Ok(())
    }
}

/// Picks the effective API key: explicit value first, then the stored one.
pub fn effective_api_key(explicit: Option<&str>, store: &ApiKeyStore) -> Option<String> {
    explicit
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .or_else(|| Some(store.load()).filter(|k| !k.is_empty()))
}

/// Masks a key for display, keeping the last four characters.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), visible)
}
