//! The client seam every NAS backend implements.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::model::{DeviceInfo, SystemInfo, SystemStatus, SystemVersion};

/// Login details for a NAS.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Host name, address or backend URL.
    pub host: String,
    /// Firmware API generation (2 or 5); `None` leaves it to the backend.
    pub version: Option<u8>,
}

impl Credentials {
    /// Creates credentials from their parts.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            host: host.into(),
            version: None,
        }
    }

    /// Pins the firmware API generation.
    pub fn with_version(mut self, version: Option<u8>) -> Self {
        self.version = version;
        self
    }
}

/// Async access to the NAS management endpoints.
///
/// A client is opened once, used for the lifetime of the monitored device
/// and closed once. Endpoint calls take `&self` so one fetch cycle may join
/// them concurrently.
#[async_trait]
pub trait NasApi: Send + Sync {
    /// Establishes the session (login).
    async fn open(&mut self) -> Result<()>;

    /// Releases the session.
    async fn close(&mut self) -> Result<()>;

    async fn system_info(&self) -> Result<SystemInfo>;

    async fn system_status(&self) -> Result<SystemStatus>;

    async fn device_info(&self) -> Result<DeviceInfo>;

    async fn system_version(&self) -> Result<SystemVersion>;

    /// Share names, passed through unmodelled.
    async fn share_names(&self) -> Result<Value>;

    /// Network configuration, passed through unmodelled.
    async fn network_info(&self) -> Result<Value>;

    /// Latest available firmware, passed through unmodelled.
    async fn latest_version(&self) -> Result<Value>;

    /// User accounts, passed through unmodelled.
    async fn accounts(&self) -> Result<Value>;

    /// Active alerts, passed through unmodelled.
    async fn alerts(&self) -> Result<Value>;
}
