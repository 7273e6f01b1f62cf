//! Point-in-time view of the NAS assembled from one fetch cycle.

use chrono::{DateTime, Utc};
use mycloud_nas::{DeviceInfo, NasApi, SystemInfo, SystemStatus, SystemVersion};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every endpoint result of one successful fetch cycle.
///
/// Snapshots are never patched: a cycle either produces a whole new one or
/// nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub fetched_at: DateTime<Utc>,
    pub device_info: DeviceInfo,
    pub system_version: SystemVersion,
    pub system_status: SystemStatus,
    pub system_info: SystemInfo,
    /// Present when the extended endpoint set is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended: Option<ExtendedInfo>,
}

/// Pass-through payloads that no entity projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedInfo {
    pub share_names: Value,
    pub network_info: Value,
    pub latest_version: Value,
    pub accounts: Value,
    pub alerts: Value,
}

/// Calls every endpoint and assembles a snapshot.
///
/// Calls are joined concurrently; the first error aborts the cycle.
pub async fn fetch(api: &dyn NasApi, extended: bool) -> mycloud_nas::Result<Snapshot> {
    let (system_info, system_status, device_info, system_version) = tokio::try_join!(
        api.system_info(),
        api.system_status(),
        api.device_info(),
        api.system_version(),
    )?;

    let extended = if extended {
        let (share_names, network_info, latest_version, accounts, alerts) = tokio::try_join!(
            api.share_names(),
            api.network_info(),
            api.latest_version(),
            api.accounts(),
            api.alerts(),
        )?;
        Some(ExtendedInfo {
            share_names,
            network_info,
            latest_version,
            accounts,
            alerts,
        })
    } else {
        None
    };

    Ok(Snapshot {
        fetched_at: Utc::now(),
        device_info,
        system_version,
        system_status,
        system_info,
        extended,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeNas;

    #[tokio::test]
    async fn test_fetch_core_endpoints_only() {
        let nas = FakeNas::new();
        let snapshot = fetch(&nas, false).await.unwrap();
        assert_eq!(snapshot.device_info.serial_number, "WDNAS001");
        assert_eq!(snapshot.system_info.disks.len(), 2);
        assert!(snapshot.extended.is_none());
        assert_eq!(nas.calls(), 4);
    }

    #[tokio::test]
    async fn test_fetch_extended_endpoints() {
        let nas = FakeNas::new();
        let snapshot = fetch(&nas, true).await.unwrap();
        let extended = snapshot.extended.unwrap();
        assert_eq!(extended.alerts[0]["msg"], "Fan failure");
        assert_eq!(nas.calls(), 9);
    }

    #[tokio::test]
    async fn test_any_endpoint_failure_fails_cycle() {
        let nas = FakeNas::new();
        nas.fail_endpoint(Some("alerts"));
        assert!(fetch(&nas, true).await.is_err());
        // The failing endpoint is not part of the core set.
        assert!(fetch(&nas, false).await.is_ok());
    }
}
