//! Configuration for the organize agent
//!
//! Persistent settings live in `<config_dir>/filesorter/config.json` and are
//! created with defaults on first load. `FILESORTER_API_URL` and
//! `FILESORTER_ACCESS_TOKEN` override the file (handy with a `.env`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_DIR_NAME: &str = "filesorter";
const CONFIG_FILE_NAME: &str = "config.json";

pub const ENV_API_URL: &str = "FILESORTER_API_URL";
pub const ENV_ACCESS_TOKEN: &str = "FILESORTER_ACCESS_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// API server URL
    pub api_url: String,

    /// Web dashboard URL
    pub dashboard_url: String,

    /// Access token for API authentication
    pub access_token: Option<String>,

    /// Refresh token for renewing access
    pub refresh_token: Option<String>,

    /// Show desktop notifications
    pub show_notifications: bool,

    /// Delay in seconds before processing a new file
    pub processing_delay_seconds: u64,

    /// Auto-organize tunables
    pub limits: OrganizeLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8085".to_string(),
            dashboard_url: "http://localhost:3000".to_string(),
            access_token: None,
            refresh_token: None,
            show_notifications: true,
            processing_delay_seconds: 3,
            limits: OrganizeLimits::default(),
        }
    }
}

impl AppConfig {
    /// Default location of the config file
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::default_path()?)?;
        config.apply_env();
        Ok(config)
    }

    /// Load from `path`, writing defaults there if it does not exist yet
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Environment variables win over the file
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            if !url.trim().is_empty() {
                self.api_url = url;
            }
        }
        if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN) {
            if !token.trim().is_empty() {
                self.access_token = Some(token);
            }
        }
    }

    /// Base URL for API routes, without a trailing slash
    pub fn api_base(&self) -> String {
        format!("{}/api", self.api_url.trim_end_matches('/'))
    }
}

/// Limits applied by the organize engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrganizeLimits {
    /// Folders with more files than this are refused before any remote call
    pub max_files: usize,
    /// Bytes read per file for content extraction
    pub extraction_max_bytes: usize,
    /// Files extracted concurrently per window
    pub extraction_window: usize,
    /// Soft cluster bounds forwarded to the service
    pub min_clusters: u32,
    pub max_clusters: u32,
    /// Timeout for a single service request
    pub request_timeout_secs: u64,
}

impl Default for OrganizeLimits {
    fn default() -> Self {
        Self {
            max_files: 5000,
            extraction_max_bytes: 50_000,
            extraction_window: 5,
            min_clusters: 3,
            max_clusters: 15,
            request_timeout_secs: 120,
        }
    }
}

impl OrganizeLimits {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Common user folder paths offered as organize targets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserFolders {
    pub desktop: Option<String>,
    pub documents: Option<String>,
    pub downloads: Option<String>,
    pub home: Option<String>,
}

pub fn user_folders() -> UserFolders {
    let to_string = |p: PathBuf| p.to_string_lossy().to_string();
    UserFolders {
        desktop: dirs::desktop_dir().map(to_string),
        documents: dirs::document_dir().map(to_string),
        downloads: dirs::download_dir().map(to_string),
        home: dirs::home_dir().map(to_string),
    }
}
