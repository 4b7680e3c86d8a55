//! Application configuration.
//!
//! Read once at startup from a JSON file. Missing keys take their defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const DEFAULT_DATA_BASE: &str = "https://alexanderkabanov3.github.io/eyes/assets/data";

/// Placeholder replaced by the page index in URL templates.
pub const PAGE_PLACEHOLDER: &str = "{page}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Remote resources of the data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub manifest_url: String,
    /// Contains [`PAGE_PLACEHOLDER`].
    pub coordinates_url: String,
    /// Contains [`PAGE_PLACEHOLDER`].
    pub image_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            manifest_url: format!("{DEFAULT_DATA_BASE}/input.json"),
            coordinates_url: format!("{DEFAULT_DATA_BASE}/coordinates{PAGE_PLACEHOLDER}.json"),
            image_url: format!("{DEFAULT_DATA_BASE}/ptosis-{PAGE_PLACEHOLDER}.jpg"),
        }
    }
}

impl Endpoints {
    pub fn coordinates(&self, page: u32) -> String {
        self.coordinates_url.replace(PAGE_PLACEHOLDER, &page.to_string())
    }

    pub fn image(&self, page: u32) -> String {
        self.image_url.replace(PAGE_PLACEHOLDER, &page.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoints: Endpoints,
    /// Number of page markers shown.
    pub page_count: u32,
    pub request_timeout_secs: u64,
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            page_count: 5,
            request_timeout_secs: 10,
            log_level: LogLevel::default(),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(crate::APP_DIR).join("config.json"))
    }

    /// Loads `explicit` if given, else the default path, else defaults.
    ///
    /// Runs before logging is set up, so problems are returned as messages
    /// for the caller to log.
    pub fn resolve(explicit: Option<&Path>) -> (Self, Option<String>) {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.exists() => path,
                _ => return (Self::default(), None),
            },
        };
        match Self::load(&path) {
            Ok(config) => (config, Some(format!("Loaded configuration from {path:?}"))),
            Err(e) => (
                Self::default(),
                Some(format!("Using default configuration, {path:?} unusable: {e}")),
            ),
        }
    }
}
