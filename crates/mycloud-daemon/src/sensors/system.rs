//! NAS-level metrics.

use super::data::{bytes_to_tb, used_percent};
use super::{Metric, State};
use crate::snapshot::Snapshot;

pub(super) const METRICS: [Metric; 5] = [
    Metric::CpuUsage,
    Metric::MemoryUsage,
    Metric::StorageTotal,
    Metric::StorageUsed,
    Metric::StorageUnused,
];

pub(super) fn project(metric: Metric, snapshot: &Snapshot) -> Option<State> {
    let size = &snapshot.system_info.size;
    match metric {
        Metric::CpuUsage => Some(State::Number(snapshot.system_status.cpu)),
        Metric::MemoryUsage => {
            let memory = &snapshot.system_status.memory;
            used_percent(memory.total, memory.unused).map(State::Number)
        }
        Metric::StorageTotal => Some(State::Number(bytes_to_tb(size.total))),
        Metric::StorageUsed => Some(State::Number(bytes_to_tb(size.used))),
        Metric::StorageUnused => Some(State::Number(bytes_to_tb(size.unused))),
        _ => None,
    }
}
