//! Per-volume metrics.

use mycloud_nas::Volume;

use super::data::bytes_to_tb;
use super::{Metric, State};

pub(super) const METRICS: [Metric; 4] = [
    Metric::VolumeSize,
    Metric::VolumeMounted,
    Metric::VolumeUnlocked,
    Metric::VolumeEncrypted,
];

/// Projects a volume metric; `volume` is `None` when it is gone.
pub(super) fn project(metric: Metric, volume: Option<&Volume>) -> Option<State> {
    match metric {
        Metric::VolumeSize => volume.map(|v| State::Number(bytes_to_tb(v.size))),
        Metric::VolumeMounted => Some(State::Bool(volume.is_some_and(|v| v.mounted))),
        Metric::VolumeUnlocked => Some(State::Bool(volume.is_some_and(|v| v.unlocked))),
        Metric::VolumeEncrypted => Some(State::Bool(volume.is_some_and(|v| v.encrypted))),
        _ => None,
    }
}
