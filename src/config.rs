use serde::Deserialize;
use std::{env, fs, path::Path, time::Duration};
use tracing::info;

use crate::analysis::DEFAULT_RECENT_WINDOW;
use crate::error::ConfigError;

pub const ACCESS_TOKEN_ENV: &str = "GMAIL_ACCESS_TOKEN";

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Config {
    pub gmail: GmailConfig,
    pub backend: BackendConfig,
    pub analysis: AnalysisConfig,
    pub cache: CacheConfig,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct GmailConfig {
    pub api_base: String,
    pub user: String,
    pub access_token: Option<String>,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_base: "https://gmail.googleapis.com/gmail/v1".to_string(),
            user: "me".to_string(),
            access_token: None,
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub analyze_path: String,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            analyze_path: "/analyze".to_string(),
            timeout_secs: 30,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct AnalysisConfig {
    /// How many recent messages accompany the current one.
    pub recent_window: usize,
    /// Gmail search applied when listing messages for display. Empty disables it.
    pub listing_query: Option<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            recent_window: DEFAULT_RECENT_WINDOW,
            listing_query: Some("newer_than:1d".into()),
        }
    }
}

#[derive(Deserialize, Debug)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: u64,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl_secs: 24 * 60 * 60,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            info!(path = %path.display(), "Loading config");
            Self::load(path)
        } else {
            info!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// The Gmail access token, with the environment taking precedence over the file.
    pub fn access_token(&self) -> Option<String> {
        env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.gmail.access_token.clone())
    }
}
