//! Device and entity registry derived from the first snapshot.

use mycloud_nas::MANUFACTURER;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::sensors::{Metric, Platform, State, Target, Unit};
use crate::snapshot::Snapshot;

/// Identifier namespace for devices registered by this daemon.
pub const DOMAIN: &str = "mycloud";

/// A logical device grouping entities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEntry {
    /// `(DOMAIN, id)` identifier pair.
    pub identifiers: (String, String),
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hw_version: Option<String>,
    /// Identifier of the parent device.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<(String, String)>,
}

impl DeviceEntry {
    /// Returns the device id within [`DOMAIN`].
    pub fn id(&self) -> &str {
        &self.identifiers.1
    }
}

/// One exposed sensor or binary sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub unique_id: String,
    pub name: String,
    /// Id of the owning device.
    pub device_id: String,
    pub metric: Metric,
    pub platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
    pub icon: &'static str,
    pub target: Target,
}

impl Entity {
    fn new(device: &DeviceEntry, metric: Metric, target: Target) -> Self {
        Self {
            unique_id: format!("{}_{}", device.id(), metric.key()),
            name: format!("{} {}", device.name, metric.label()),
            device_id: device.id().to_string(),
            metric,
            platform: metric.platform(),
            unit: metric.unit(),
            icon: metric.icon(),
            target,
        }
    }

    /// Reads this entity's value from `snapshot`.
    pub fn state(&self, snapshot: &Snapshot) -> Option<State> {
        self.target.project(self.metric, snapshot)
    }
}

/// An entity together with its value from one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState<'a> {
    #[serde(flatten)]
    pub entity: &'a Entity,
    pub state: Option<State>,
}

/// The fixed device and entity set of one integration instance.
///
/// Built once from the first successful snapshot. Disks and volumes that
/// appear later are not picked up until the daemon restarts; ones that
/// disappear keep their entities, which then report defaults.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    devices: Vec<DeviceEntry>,
    entities: Vec<Entity>,
}

impl Registry {
    /// Derives devices and entities from a snapshot.
    pub fn materialize(snapshot: &Snapshot) -> Self {
        let mut registry = Self::default();
        let mut seen = HashSet::new();

        let info = &snapshot.device_info;
        let firmware = &snapshot.system_version.firmware;
        let system = DeviceEntry {
            identifiers: (DOMAIN.to_string(), info.serial_number.clone()),
            name: info.name.clone(),
            manufacturer: MANUFACTURER.to_string(),
            model: info.description.clone(),
            sw_version: firmware.clone(),
            hw_version: None,
            via_device: None,
        };
        let parent = Some(system.identifiers.clone());
        registry.add_device(system, &Metric::SYSTEM, Target::System, &mut seen);

        for disk in &snapshot.system_info.disks {
            let device = DeviceEntry {
                identifiers: (DOMAIN.to_string(), disk.serial.clone()),
                name: format!("{} Disk {}", info.name, disk.name),
                manufacturer: MANUFACTURER.to_string(),
                model: disk.model.clone(),
                sw_version: firmware.clone(),
                hw_version: Some(disk.revision.clone()),
                via_device: parent.clone(),
            };
            let target = Target::Disk {
                name: disk.name.clone(),
            };
            registry.add_device(device, &Metric::DISK, target, &mut seen);
        }

        for volume in &snapshot.system_info.volumes {
            let device = DeviceEntry {
                identifiers: (DOMAIN.to_string(), volume.id.clone()),
                name: format!("{} Volume {}", info.name, volume.display_label()),
                manufacturer: MANUFACTURER.to_string(),
                model: info.description.clone(),
                sw_version: firmware.clone(),
                hw_version: None,
                via_device: parent.clone(),
            };
            let target = Target::Volume {
                id: volume.id.clone(),
            };
            registry.add_device(device, &Metric::VOLUME, target, &mut seen);
        }

        registry
    }

    fn add_device(
        &mut self,
        device: DeviceEntry,
        metrics: &[Metric],
        target: Target,
        seen: &mut HashSet<String>,
    ) {
        let before = self.entities.len();
        for &metric in metrics {
            let entity = Entity::new(&device, metric, target.clone());
            if !seen.insert(entity.unique_id.clone()) {
                warn!(
                    "Skipping {}: unique id {} already registered",
                    entity.name, entity.unique_id
                );
                continue;
            }
            self.entities.push(entity);
        }
        if self.entities.len() > before {
            debug!(
                "Registered device {} with {} entities",
                device.name,
                self.entities.len() - before
            );
            self.devices.push(device);
        }
    }

    /// Returns all devices, NAS first.
    pub fn devices(&self) -> &[DeviceEntry] {
        &self.devices
    }

    /// Returns all entities in registration order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Finds an entity by unique id.
    pub fn entity(&self, unique_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.unique_id == unique_id)
    }

    /// Projects every entity from one snapshot.
    pub fn render<'a>(&'a self, snapshot: &Snapshot) -> Vec<EntityState<'a>> {
        self.entities
            .iter()
            .map(|entity| EntityState {
                entity,
                state: entity.state(snapshot),
            })
            .collect()
    }
}
