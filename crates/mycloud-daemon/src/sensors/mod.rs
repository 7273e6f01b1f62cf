//! Sensor metrics and their projections over a snapshot.
//!
//! Each metric key has one small projection function in the module for its
//! scope (system, disk or volume). [`Target`] is the thin adapter that
//! resolves an entity's disk or volume in the current snapshot before the
//! projection runs.

pub mod data;
mod disk;
mod system;
mod volume;

use serde::{Deserialize, Serialize};

use crate::snapshot::Snapshot;

/// Entity platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Sensor,
    BinarySensor,
}

/// Unit of measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "%")]
    Percent,
    #[serde(rename = "°C")]
    Celsius,
    #[serde(rename = "TB")]
    Terabytes,
}

/// Current value of an entity. `None` at the call sites means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum State {
    Number(f64),
    Bool(bool),
}

/// Which snapshot field an entity projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CpuUsage,
    MemoryUsage,
    StorageTotal,
    StorageUsed,
    StorageUnused,
    DiskTemp,
    DiskHealthy,
    DiskSleep,
    DiskFailed,
    DiskOverTemp,
    DiskSize,
    VolumeSize,
    VolumeMounted,
    VolumeUnlocked,
    VolumeEncrypted,
}

impl Metric {
    /// Metrics attached to the NAS device.
    pub const SYSTEM: [Metric; 5] = system::METRICS;

    /// Metrics attached to every disk device.
    pub const DISK: [Metric; 6] = disk::METRICS;

    /// Metrics attached to every volume device.
    pub const VOLUME: [Metric; 4] = volume::METRICS;

    /// Stable key used in unique ids.
    pub fn key(self) -> &'static str {
        match self {
            Metric::CpuUsage => "cpu_usage",
            Metric::MemoryUsage => "memory_usage",
            Metric::StorageTotal => "storage_total",
            Metric::StorageUsed => "storage_used",
            Metric::StorageUnused => "storage_unused",
            Metric::DiskTemp => "disk_temp",
            Metric::DiskHealthy => "disk_healthy",
            Metric::DiskSleep => "disk_sleep",
            Metric::DiskFailed => "disk_failed",
            Metric::DiskOverTemp => "disk_over_temp",
            Metric::DiskSize => "disk_size",
            Metric::VolumeSize => "volume_size",
            Metric::VolumeMounted => "volume_mounted",
            Metric::VolumeUnlocked => "volume_unlocked",
            Metric::VolumeEncrypted => "volume_encrypted",
        }
    }

    /// Label appended to the device name to form the display name.
    pub fn label(self) -> &'static str {
        match self {
            Metric::CpuUsage => "CPU Usage",
            Metric::MemoryUsage => "Memory Usage",
            Metric::StorageTotal => "Total Storage",
            Metric::StorageUsed => "Used Storage",
            Metric::StorageUnused => "Free Storage",
            Metric::DiskTemp => "Temperature",
            Metric::DiskHealthy => "Healthy",
            Metric::DiskSleep => "Sleeping",
            Metric::DiskFailed => "Failed",
            Metric::DiskOverTemp => "Over Temperature",
            Metric::DiskSize => "Size",
            Metric::VolumeSize => "Size",
            Metric::VolumeMounted => "Mounted",
            Metric::VolumeUnlocked => "Unlocked",
            Metric::VolumeEncrypted => "Encrypted",
        }
    }

    /// Unit of measurement, `None` for binary sensors.
    pub fn unit(self) -> Option<Unit> {
        match self {
            Metric::CpuUsage | Metric::MemoryUsage => Some(Unit::Percent),
            Metric::DiskTemp => Some(Unit::Celsius),
            Metric::StorageTotal
            | Metric::StorageUsed
            | Metric::StorageUnused
            | Metric::DiskSize
            | Metric::VolumeSize => Some(Unit::Terabytes),
            _ => None,
        }
    }

    /// Platform the entity registers under.
    pub fn platform(self) -> Platform {
        if self.unit().is_some() {
            Platform::Sensor
        } else {
            Platform::BinarySensor
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Metric::CpuUsage => "mdi:cpu-64-bit",
            Metric::MemoryUsage => "mdi:memory",
            Metric::StorageTotal | Metric::StorageUsed | Metric::StorageUnused => "mdi:nas",
            Metric::DiskTemp => "mdi:thermometer",
            Metric::DiskHealthy => "mdi:shield-check",
            Metric::DiskSleep => "mdi:sleep",
            Metric::DiskFailed => "mdi:alert",
            Metric::DiskOverTemp => "mdi:thermometer-alert",
            Metric::DiskSize | Metric::VolumeSize => "mdi:harddisk",
            Metric::VolumeMounted => "mdi:folder-network",
            Metric::VolumeUnlocked => "mdi:lock-open-variant",
            Metric::VolumeEncrypted => "mdi:lock",
        }
    }
}

/// Where in the snapshot an entity's subject lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    System,
    /// A disk, matched by bay name.
    Disk { name: String },
    /// A volume, matched by id.
    Volume { id: String },
}

impl Target {
    /// Projects `metric` for this target out of `snapshot`.
    ///
    /// Disks and volumes are looked up by identity on every call, so a
    /// reordered inventory never shifts values between devices. A subject
    /// missing from the snapshot yields `false` for flags and unknown for
    /// numbers.
    pub fn project(&self, metric: Metric, snapshot: &Snapshot) -> Option<State> {
        match self {
            Target::System => system::project(metric, snapshot),
            Target::Disk { name } => disk::project(metric, snapshot.system_info.disk(name)),
            Target::Volume { id } => volume::project(metric, snapshot.system_info.volume(id)),
        }
    }
}
