//! Per-disk metrics.

use mycloud_nas::Disk;

use super::data::bytes_to_tb;
use super::{Metric, State};

pub(super) const METRICS: [Metric; 6] = [
    Metric::DiskTemp,
    Metric::DiskHealthy,
    Metric::DiskSleep,
    Metric::DiskFailed,
    Metric::DiskOverTemp,
    Metric::DiskSize,
];

/// Projects a disk metric; `disk` is `None` when the bay vanished.
pub(super) fn project(metric: Metric, disk: Option<&Disk>) -> Option<State> {
    match metric {
        Metric::DiskTemp => disk.map(|d| State::Number(f64::from(d.temperature))),
        Metric::DiskSize => disk.map(|d| State::Number(bytes_to_tb(d.size))),
        Metric::DiskHealthy => Some(State::Bool(disk.is_some_and(|d| d.healthy))),
        Metric::DiskSleep => Some(State::Bool(disk.is_some_and(|d| d.sleep))),
        Metric::DiskFailed => Some(State::Bool(disk.is_some_and(|d| d.failed))),
        Metric::DiskOverTemp => Some(State::Bool(disk.is_some_and(|d| d.over_temp))),
        _ => None,
    }
}
