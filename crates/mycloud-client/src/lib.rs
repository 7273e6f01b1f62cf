//! HTTP client library for communicating with the My Cloud Monitor daemon.

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Default daemon address.
pub const DEFAULT_URL: &str = "http://127.0.0.1:8787";

/// Coordinator status.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub last_update_success: bool,
    pub last_error: Option<String>,
    pub last_attempt: Option<String>,
    pub last_success: Option<String>,
    pub cycles: u64,
    pub failures: u64,
    pub device_count: usize,
    pub entity_count: usize,
    pub update_interval: u64,
}

/// A logical device in the daemon's registry.
#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub identifiers: (String, String),
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: String,
    pub hw_version: Option<String>,
    pub via_device: Option<(String, String)>,
}

impl Device {
    /// Returns the device id.
    pub fn id(&self) -> &str {
        &self.identifiers.1
    }
}

/// An entity with its current state.
#[derive(Debug, Clone, Deserialize)]
pub struct Entity {
    pub unique_id: String,
    pub name: String,
    pub device_id: String,
    pub metric: String,
    pub platform: String,
    pub unit: Option<String>,
    pub icon: String,
    /// Number, boolean, or null when unknown.
    pub state: Option<Value>,
}

impl Entity {
    /// Formats the state for display ("42.5 %", "on", "unknown").
    pub fn display_state(&self) -> String {
        match &self.state {
            None | Some(Value::Null) => "unknown".to_string(),
            Some(Value::Bool(true)) => "on".to_string(),
            Some(Value::Bool(false)) => "off".to_string(),
            Some(value) => match &self.unit {
                Some(unit) => format!("{} {}", value, unit),
                None => value.to_string(),
            },
        }
    }
}

/// Daemon runtime options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    pub update_interval: u64,
}

/// Body returned by a successful refresh.
#[derive(Debug, Clone, Deserialize)]
struct RefreshResponse {
    fetched_at: String,
}

/// HTTP client wrapper for the daemon.
pub struct DaemonClient {
    base: String,
    http: Client,
}

impl DaemonClient {
    /// Creates a client for the daemon at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to {}. Is mycloudd running?", what))?;
        let status = response.status();
        debug!("{} -> {}", what, status);

        if status.is_success() {
            return response
                .json()
                .await
                .with_context(|| format!("Failed to decode response to {}", what));
        }

        let message = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| status.to_string());
        anyhow::bail!("Failed to {}: {}", what, message)
    }

    /// Gets the coordinator status.
    pub async fn status(&self) -> Result<Status> {
        self.send(self.http.get(self.url("status")), "get status")
            .await
    }

    /// Lists devices.
    pub async fn devices(&self) -> Result<Vec<Device>> {
        self.send(self.http.get(self.url("devices")), "list devices")
            .await
    }

    /// Lists entities, optionally limited to one device.
    pub async fn entities(&self, device: Option<&str>) -> Result<Vec<Entity>> {
        let mut request = self.http.get(self.url("entities"));
        if let Some(device) = device {
            request = request.query(&[("device", device)]);
        }
        self.send(request, "list entities").await
    }

    /// Gets one entity, `None` when the id is unknown.
    pub async fn entity(&self, unique_id: &str) -> Result<Option<Entity>> {
        let response = self
            .http
            .get(self.url(&format!("entities/{}", unique_id)))
            .send()
            .await
            .context("Failed to get entity. Is mycloudd running?")?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let entity = response
            .error_for_status()
            .context("Failed to get entity")?
            .json()
            .await
            .context("Failed to decode entity")?;
        Ok(Some(entity))
    }

    /// Gets the raw latest snapshot.
    pub async fn snapshot(&self) -> Result<Value> {
        self.send(self.http.get(self.url("snapshot")), "get snapshot")
            .await
    }

    /// Runs a fetch cycle now; returns the snapshot timestamp.
    pub async fn refresh(&self) -> Result<String> {
        let response: RefreshResponse = self
            .send(self.http.post(self.url("refresh")), "refresh")
            .await?;
        Ok(response.fetched_at)
    }

    /// Gets the runtime options.
    pub async fn options(&self) -> Result<Options> {
        self.send(self.http.get(self.url("options")), "get options")
            .await
    }

    /// Sets the poll period in seconds.
    pub async fn set_update_interval(&self, seconds: u64) -> Result<Options> {
        let body = Options {
            update_interval: seconds,
        };
        self.send(
            self.http.post(self.url("options")).json(&body),
            "set update interval",
        )
        .await
    }
}
