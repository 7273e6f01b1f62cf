//! Integration instance state.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::{Config, MIN_UPDATE_INTERVAL};
use crate::coordinator::{Coordinator, UpdateStatus};
use crate::error::{SetupError, UpdateFailed};
use crate::registry::Registry;
use crate::snapshot::Snapshot;

/// Runtime options persisted to the state directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    /// Poll period in seconds.
    #[serde(default = "default_update_interval")]
    pub update_interval: u64,
}

fn default_update_interval() -> u64 {
    600
}

impl Default for Options {
    fn default() -> Self {
        Self {
            update_interval: default_update_interval(),
        }
    }
}

/// Summary served by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub update: UpdateStatus,
    pub device_count: usize,
    pub entity_count: usize,
    pub update_interval: u64,
}

/// One running integration: client, coordinator, registry and options.
///
/// Everything the poll loop and the web API touch hangs off this value;
/// nothing lives in process-wide state.
pub struct Integration {
    coordinator: Arc<Coordinator>,
    registry: Registry,
    options: RwLock<Options>,
    state_dir: PathBuf,
}

impl Integration {
    /// Opens the client, runs the first fetch cycle and materializes the
    /// entity set.
    ///
    /// The caller keeps its own handle on `coordinator`, so a setup that is
    /// abandoned midway can still be closed. On failure the client is closed
    /// again and no entities exist.
    pub async fn setup(
        coordinator: Arc<Coordinator>,
        config: &Config,
    ) -> std::result::Result<Self, SetupError> {
        let state_dir = PathBuf::from(&config.state_dir);
        if let Err(e) = std::fs::create_dir_all(&state_dir) {
            warn!("Failed to create state directory {:?}: {}", state_dir, e);
        }
        let options = Self::load_options(&state_dir, config.options.update_interval);

        let first = match coordinator.open().await {
            Ok(()) => coordinator.refresh().await.map_err(SetupError::from),
            Err(e) => Err(SetupError::from(e)),
        };
        let snapshot = match first {
            Ok(snapshot) => snapshot,
            Err(e) => {
                if let Err(close_err) = coordinator.close().await {
                    warn!("Failed to close client after setup failure: {}", close_err);
                }
                return Err(e);
            }
        };

        let registry = Registry::materialize(&snapshot);
        info!(
            "Set up {} ({}): {} devices, {} entities",
            snapshot.device_info.name,
            snapshot.device_info.serial_number,
            registry.devices().len(),
            registry.entities().len()
        );
        info!("Update interval: {}s", options.update_interval);

        Ok(Self {
            coordinator,
            registry,
            options: RwLock::new(options),
            state_dir,
        })
    }

    /// Closes the client session.
    pub async fn teardown(&self) {
        match self.coordinator.close().await {
            Ok(()) => info!("NAS client closed"),
            Err(e) => warn!("Failed to close NAS client: {}", e),
        }
    }

    /// Loads options from the state directory, falling back to the
    /// configured interval.
    fn load_options(state_dir: &Path, configured_interval: u64) -> Options {
        let options_file = state_dir.join("options.toml");
        let mut options = std::fs::read_to_string(&options_file)
            .ok()
            .and_then(|content| toml::from_str(&content).ok())
            .unwrap_or(Options {
                update_interval: configured_interval,
            });
        if options.update_interval < MIN_UPDATE_INTERVAL {
            warn!(
                "Update interval {}s below minimum, using {}s",
                options.update_interval, MIN_UPDATE_INTERVAL
            );
            options.update_interval = MIN_UPDATE_INTERVAL;
        }
        options
    }

    /// Saves options to the state directory.
    fn save_options(&self) {
        let options = self.options.read().unwrap().clone();
        let options_file = self.state_dir.join("options.toml");
        match toml::to_string_pretty(&options) {
            Ok(content) => {
                if let Err(e) = std::fs::write(&options_file, content) {
                    warn!("Failed to save options: {}", e);
                }
            }
            Err(e) => {
                warn!("Failed to serialize options: {}", e);
            }
        }
    }

    /// Runs one fetch cycle.
    pub async fn refresh(&self) -> std::result::Result<Arc<Snapshot>, UpdateFailed> {
        self.coordinator.refresh().await
    }

    /// Returns the most recent snapshot.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.coordinator.latest()
    }

    /// Subscribes to snapshot publications.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.coordinator.subscribe()
    }

    /// Returns the device and entity registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Returns the current options.
    pub fn options(&self) -> Options {
        self.options.read().unwrap().clone()
    }

    /// Returns the poll period.
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.options.read().unwrap().update_interval)
    }

    /// Sets the poll period in seconds; takes effect after the current wait.
    pub fn set_update_interval(&self, seconds: u64) -> Result<()> {
        if seconds < MIN_UPDATE_INTERVAL {
            anyhow::bail!(
                "update_interval must be at least {} seconds",
                MIN_UPDATE_INTERVAL
            );
        }
        self.options.write().unwrap().update_interval = seconds;
        self.save_options();
        info!("Update interval set to {}s", seconds);
        Ok(())
    }

    /// Builds the status summary.
    pub fn status(&self) -> StatusReport {
        StatusReport {
            update: self.coordinator.status(),
            device_count: self.registry.devices().len(),
            entity_count: self.registry.entities().len(),
            update_interval: self.options.read().unwrap().update_interval,
        }
    }
}
