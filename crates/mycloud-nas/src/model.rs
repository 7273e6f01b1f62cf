//! Records returned by the NAS management endpoints.
//!
//! Field names follow the JSON the device emits; a few are renamed to
//! something readable on the Rust side (`sn`, `rev`, `temp`).

use serde::{Deserialize, Serialize};

/// Identity of the NAS itself (`device_info` endpoint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Serial number, the stable identity key of the device.
    pub serial_number: String,
    /// User-assigned device name.
    pub name: String,
    /// Model description (e.g. "WD My Cloud EX2 Ultra").
    pub description: String,
}

/// Firmware information (`system_version` endpoint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemVersion {
    /// Installed firmware version.
    pub firmware: String,
}

/// Load and memory figures (`system_status` endpoint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    /// CPU utilisation percentage (0-100).
    pub cpu: f64,
    /// Memory totals in bytes.
    pub memory: MemoryStatus,
}

/// Memory totals in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStatus {
    pub total: u64,
    pub unused: u64,
}

/// Storage inventory (`system_info` endpoint).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Aggregate storage totals.
    pub size: StorageSize,
    /// Physical disks in the order the device reports them.
    #[serde(default)]
    pub disks: Vec<Disk>,
    /// Storage volumes in the order the device reports them.
    #[serde(default)]
    pub volumes: Vec<Volume>,
}

/// Aggregate storage totals in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageSize {
    pub total: u64,
    pub used: u64,
    pub unused: u64,
}

/// A physical disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    /// Bay name, unique within one inventory.
    pub name: String,
    #[serde(rename = "sn")]
    pub serial: String,
    pub model: String,
    /// Hardware revision.
    #[serde(rename = "rev")]
    pub revision: String,
    /// Capacity in bytes.
    pub size: u64,
    /// Temperature in degrees Celsius.
    #[serde(rename = "temp")]
    pub temperature: i32,
    pub healthy: bool,
    pub sleep: bool,
    pub failed: bool,
    pub over_temp: bool,
}

/// A storage volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub label: String,
    pub name: String,
    /// Capacity in bytes.
    pub size: u64,
    pub mounted: bool,
    pub unlocked: bool,
    pub encrypted: bool,
}

impl SystemInfo {
    /// Finds a disk by its bay name.
    pub fn disk(&self, name: &str) -> Option<&Disk> {
        self.disks.iter().find(|d| d.name == name)
    }

    /// Finds a volume by its id.
    pub fn volume(&self, id: &str) -> Option<&Volume> {
        self.volumes.iter().find(|v| v.id == id)
    }
}

impl Volume {
    /// Label for display, falling back to the volume name.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }
}
