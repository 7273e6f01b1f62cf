//! Replay backend serving endpoint records from a JSON document.
//!
//! The document holds one top-level key per endpoint:
//!
//! ```json
//! {
//!   "device_info": {"serial_number": "...", "name": "...", "description": "..."},
//!   "system_version": {"firmware": "5.26.202"},
//!   "system_status": {"cpu": 12.5, "memory": {"total": 1024, "unused": 512}},
//!   "system_info": {"size": {...}, "disks": [...], "volumes": [...]},
//!   "alerts": []
//! }
//! ```
//!
//! The file is re-read on every call so edits show up on the next cycle.
//! A section of the form `{"error": "message"}` makes that endpoint fail.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::api::{Credentials, NasApi};
use crate::error::{Error, Result};
use crate::model::{DeviceInfo, SystemInfo, SystemStatus, SystemVersion};

/// URL scheme selecting the replay backend.
pub const SCHEME: &str = "file://";

/// NAS client backed by a JSON document on disk.
pub struct ReplayClient {
    path: PathBuf,
    username: String,
    version: Option<u8>,
    open: bool,
}

impl ReplayClient {
    /// Creates a replay client for the document at `path`.
    pub fn new<P: AsRef<Path>>(path: P, credentials: &Credentials) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            username: credentials.username.clone(),
            version: credentials.version,
            open: false,
        }
    }

    /// Returns the document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the firmware API generation the session was pinned to.
    pub fn version(&self) -> Option<u8> {
        self.version
    }

    async fn section<T: DeserializeOwned>(&self, endpoint: &'static str) -> Result<T> {
        if !self.open {
            return Err(Error::NotOpen);
        }

        let content = tokio::fs::read_to_string(&self.path).await?;
        let mut document: Value = serde_json::from_str(&content)?;
        let section = document
            .get_mut(endpoint)
            .map(Value::take)
            .ok_or(Error::MissingField(endpoint))?;

        if let Some(message) = section.get("error").and_then(Value::as_str) {
            return Err(Error::Request(format!("{}: {}", endpoint, message)));
        }

        debug!("Replayed endpoint {}", endpoint);
        Ok(serde_json::from_value(section)?)
    }
}

#[async_trait]
impl NasApi for ReplayClient {
    async fn open(&mut self) -> Result<()> {
        tokio::fs::metadata(&self.path).await?;
        self.open = true;
        match self.version {
            Some(version) => info!(
                "Replay session opened for {} from {:?} (API v{})",
                self.username, self.path, version
            ),
            None => info!(
                "Replay session opened for {} from {:?}",
                self.username, self.path
            ),
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        info!("Replay session closed");
        Ok(())
    }

    async fn system_info(&self) -> Result<SystemInfo> {
        self.section("system_info").await
    }

    async fn system_status(&self) -> Result<SystemStatus> {
        self.section("system_status").await
    }

    async fn device_info(&self) -> Result<DeviceInfo> {
        self.section("device_info").await
    }

    async fn system_version(&self) -> Result<SystemVersion> {
        self.section("system_version").await
    }

    async fn share_names(&self) -> Result<Value> {
        self.section("share_names").await
    }

    async fn network_info(&self) -> Result<Value> {
        self.section("network_info").await
    }

    async fn latest_version(&self) -> Result<Value> {
        self.section("latest_version").await
    }

    async fn accounts(&self) -> Result<Value> {
        self.section("accounts").await
    }

    async fn alerts(&self) -> Result<Value> {
        self.section("alerts").await
    }
}
