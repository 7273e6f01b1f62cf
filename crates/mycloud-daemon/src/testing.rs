//! In-memory NAS fake and fixtures for tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mycloud_nas::{
    DeviceInfo, Disk, Error, MemoryStatus, NasApi, Result, StorageSize, SystemInfo, SystemStatus,
    SystemVersion, Volume,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::Config;
use crate::coordinator::Coordinator;
use crate::error::SetupError;
use crate::snapshot::Snapshot;
use crate::state::Integration;

const TB: u64 = 1_099_511_627_776;

/// A disk that is healthy, awake and 4 TB.
pub fn disk(name: &str, serial: &str) -> Disk {
    Disk {
        name: name.to_string(),
        serial: serial.to_string(),
        model: "WD40EFRX".to_string(),
        revision: "82.00A82".to_string(),
        size: 4 * TB,
        temperature: 35,
        healthy: true,
        sleep: false,
        failed: false,
        over_temp: false,
    }
}

/// A mounted, unlocked, unencrypted 3 TB volume.
pub fn volume(id: &str, label: &str) -> Volume {
    Volume {
        id: id.to_string(),
        label: label.to_string(),
        name: format!("HD_a{}", id),
        size: 3 * TB,
        mounted: true,
        unlocked: true,
        encrypted: false,
    }
}

/// Endpoint payloads served by [`FakeNas`].
#[derive(Debug, Clone)]
pub struct Fixture {
    pub device_info: DeviceInfo,
    pub system_version: SystemVersion,
    pub system_status: SystemStatus,
    pub system_info: SystemInfo,
    pub alerts: Value,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            device_info: DeviceInfo {
                serial_number: "WDNAS001".to_string(),
                name: "MyCloud".to_string(),
                description: "WD My Cloud EX2 Ultra".to_string(),
            },
            system_version: SystemVersion {
                firmware: "5.26.202".to_string(),
            },
            system_status: SystemStatus {
                cpu: 12.5,
                memory: MemoryStatus {
                    total: 1_000,
                    unused: 250,
                },
            },
            system_info: SystemInfo {
                size: StorageSize {
                    total: 8 * TB,
                    used: 2 * TB,
                    unused: 6 * TB,
                },
                disks: vec![disk("A", "SN-A"), disk("B", "SN-B")],
                volumes: vec![volume("1", "Volume_1")],
            },
            alerts: json!([{"msg": "Fan failure", "severity": "critical"}]),
        }
    }
}

/// Two disks, one volume, fixed timestamp.
pub fn snapshot() -> Snapshot {
    let fixture = Fixture::default();
    Snapshot {
        fetched_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        device_info: fixture.device_info,
        system_version: fixture.system_version,
        system_status: fixture.system_status,
        system_info: fixture.system_info,
        extended: None,
    }
}

/// Endpoint made to fail, for a number of calls or until healed.
struct Failure {
    endpoint: &'static str,
    remaining: Option<usize>,
}

struct Inner {
    fixture: Mutex<Fixture>,
    failing: Mutex<Option<Failure>>,
    latency: Mutex<Duration>,
    open: AtomicBool,
    calls: AtomicUsize,
    closed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Cloneable in-memory NAS; clones share state so tests can steer a client
/// that has been handed to a coordinator.
#[derive(Clone)]
pub struct FakeNas {
    inner: Arc<Inner>,
}

impl FakeNas {
    /// Creates an open fake serving the default fixture.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                fixture: Mutex::new(Fixture::default()),
                failing: Mutex::new(None),
                latency: Mutex::new(Duration::ZERO),
                open: AtomicBool::new(true),
                calls: AtomicUsize::new(0),
                closed: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Makes `endpoint` fail from now on; `None` heals it.
    pub fn fail_endpoint(&self, endpoint: Option<&'static str>) {
        *self.inner.failing.lock().unwrap() = endpoint.map(|endpoint| Failure {
            endpoint,
            remaining: None,
        });
    }

    /// Makes the next `times` calls of `endpoint` fail.
    pub fn fail_endpoint_times(&self, endpoint: &'static str, times: usize) {
        *self.inner.failing.lock().unwrap() = Some(Failure {
            endpoint,
            remaining: Some(times),
        });
    }

    /// Delays every endpoint call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.inner.latency.lock().unwrap() = latency;
    }

    /// Most endpoint calls ever in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    /// Edits the served payloads.
    pub fn update<F: FnOnce(&mut Fixture)>(&self, f: F) {
        f(&mut self.inner.fixture.lock().unwrap());
    }

    /// Number of endpoint calls made.
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Number of times the session was closed.
    pub fn closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    fn should_fail(&self, endpoint: &'static str) -> bool {
        let mut failing = self.inner.failing.lock().unwrap();
        let (hit, exhausted) = match failing.as_mut() {
            Some(failure) if failure.endpoint == endpoint => match failure.remaining.as_mut() {
                Some(left) => {
                    *left = left.saturating_sub(1);
                    (true, *left == 0)
                }
                None => (true, false),
            },
            _ => (false, false),
        };
        if exhausted {
            *failing = None;
        }
        hit
    }

    async fn serve<T>(
        &self,
        endpoint: &'static str,
        get: impl FnOnce(&Fixture) -> T,
    ) -> Result<T> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if !self.inner.open.load(Ordering::SeqCst) {
            return Err(Error::NotOpen);
        }

        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let latency = *self.inner.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.should_fail(endpoint) {
            return Err(Error::Request(format!("{} unavailable", endpoint)));
        }
        Ok(get(&self.inner.fixture.lock().unwrap()))
    }
}

#[async_trait]
impl NasApi for FakeNas {
    async fn open(&mut self) -> Result<()> {
        self.inner.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.inner.open.store(false, Ordering::SeqCst);
        self.inner.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn system_info(&self) -> Result<SystemInfo> {
        self.serve("system_info", |f| f.system_info.clone()).await
    }

    async fn system_status(&self) -> Result<SystemStatus> {
        self.serve("system_status", |f| f.system_status.clone()).await
    }

    async fn device_info(&self) -> Result<DeviceInfo> {
        self.serve("device_info", |f| f.device_info.clone()).await
    }

    async fn system_version(&self) -> Result<SystemVersion> {
        self.serve("system_version", |f| f.system_version.clone()).await
    }

    async fn share_names(&self) -> Result<Value> {
        self.serve("share_names", |_| json!(["Public", "TimeMachine"])).await
    }

    async fn network_info(&self) -> Result<Value> {
        self.serve("network_info", |_| json!({"ip": "192.168.1.20"})).await
    }

    async fn latest_version(&self) -> Result<Value> {
        self.serve("latest_version", |_| json!({"new": false})).await
    }

    async fn accounts(&self) -> Result<Value> {
        self.serve("accounts", |_| json!(["admin"])).await
    }

    async fn alerts(&self) -> Result<Value> {
        self.serve("alerts", |f| f.alerts.clone()).await
    }
}

/// Sets up an integration around `nas` the way the daemon does.
pub async fn setup_integration(
    nas: &FakeNas,
    config: &Config,
) -> std::result::Result<Integration, SetupError> {
    let coordinator = Arc::new(Coordinator::new(
        Box::new(nas.clone()),
        config.endpoints.extended,
    ));
    Integration::setup(coordinator, config).await
}

/// Config with a temporary state directory and a placeholder host.
pub fn config(state_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.state_dir = state_dir.to_string_lossy().to_string();
    config.nas.host = "fake".to_string();
    config
}
