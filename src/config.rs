//! Panel configuration.
//!
//! Loaded from `<config dir>/reflowpanel/config.toml` when present; every key
//! is optional and falls back to [`PanelConfig::default`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::PanelError;
use crate::poller::DEFAULT_POLL_INTERVAL;

/// Address the controller serves on when running as its own access point.
pub const DEFAULT_DEVICE_URL: &str = "http://192.168.4.1/";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PanelConfig {
    /// Base URL of the controller's web server.
    pub device_url: String,
    /// Status poll period in milliseconds. Clamped to the poller minimum.
    pub poll_interval_ms: u64,
    /// Per-request timeout. Unset means the network stack's default.
    pub request_timeout_ms: Option<u64>,
    pub user_agent: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            device_url: DEFAULT_DEVICE_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            request_timeout_ms: None,
            user_agent: format!("reflowpanel/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl PanelConfig {
    /// Standard config file location, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("reflowpanel").join("config.toml"))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: PanelConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load from an explicit path. The file must exist.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load from `explicit` if given, else from the default location if a
    /// file exists there, else defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            Some(path) => {
                debug!("No config at {:?}, using defaults", path);
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Parsed and checked device base URL, always ending in `/`.
    pub fn device_url(&self) -> Result<Url, PanelError> {
        let raw = self.device_url.trim();
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{}", raw)
        };

        let mut url = Url::parse(&with_scheme)
            .map_err(|e| PanelError::Config(format!("Invalid device URL '{}': {}", raw, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(PanelError::Config(format!(
                "Device URL must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if url.host_str().is_none() {
            return Err(PanelError::Config(format!("Device URL has no host: '{}'", raw)));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
