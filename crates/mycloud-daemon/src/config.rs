//! Configuration management.

use anyhow::{Context, Result};
use mycloud_nas::Credentials;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shortest poll period the options surface accepts, in seconds.
pub const MIN_UPDATE_INTERVAL: u64 = 30;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for persisted runtime options
    #[serde(default = "default_state_dir")]
    pub state_dir: String,

    /// Delay between setup attempts while the first refresh fails, in seconds
    #[serde(default = "default_setup_retry")]
    pub setup_retry: u64,

    /// NAS connection entry
    #[serde(default)]
    pub nas: NasConfig,

    /// Options applied until overridden at runtime
    #[serde(default)]
    pub options: OptionsConfig,

    /// Which endpoints each fetch cycle calls
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Web API configuration
    #[serde(default)]
    pub web: WebConfig,
}

/// NAS connection entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NasConfig {
    /// Host name, address or backend URL (e.g. "file:///var/lib/mycloud/replay.json")
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_username")]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Firmware API generation (2 or 5)
    #[serde(default)]
    pub version: Option<u8>,
}

impl Default for NasConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: default_username(),
            password: String::new(),
            version: None,
        }
    }
}

impl NasConfig {
    /// Returns the login details for the wire client.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password, &self.host)
            .with_version(self.version)
    }
}

/// Options configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Poll period in seconds
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            update_interval: default_update_interval(),
        }
    }
}

/// Endpoint selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Also fetch shares, network, firmware, accounts and alerts
    #[serde(default = "default_true")]
    pub extended: bool,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            extended: default_true(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Enable the web API
    #[serde(default = "default_true")]
    pub enable: bool,

    /// Listen address (e.g., "0.0.0.0:8787")
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enable: default_true(),
            listen: default_listen(),
        }
    }
}

// Default value functions
fn default_state_dir() -> String {
    "/var/lib/mycloud".to_string()
}

fn default_setup_retry() -> u64 {
    60
}

fn default_username() -> String {
    "admin".to_string()
}

fn default_update_interval() -> u64 {
    600
}

fn default_listen() -> String {
    "0.0.0.0:8787".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        Self::parse(&content)
    }

    /// Parses configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse configuration")?;
        if config.nas.host.is_empty() {
            anyhow::bail!("nas.host must be set");
        }
        if let Some(version) = config.nas.version {
            if version != 2 && version != 5 {
                anyhow::bail!("nas.version must be 2 or 5, got {}", version);
            }
        }
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            setup_retry: default_setup_retry(),
            nas: NasConfig::default(),
            options: OptionsConfig::default(),
            endpoints: EndpointsConfig::default(),
            web: WebConfig::default(),
        }
    }
}
