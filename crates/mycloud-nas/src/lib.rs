//! My Cloud NAS client library
//!
//! Record types for the WD My Cloud management endpoints and the async
//! client seam ([`NasApi`]) the monitoring daemon polls through.

pub mod api;
pub mod error;
pub mod model;
pub mod replay;

pub use api::{Credentials, NasApi};
pub use error::{Error, Result};
pub use model::{
    DeviceInfo, Disk, MemoryStatus, StorageSize, SystemInfo, SystemStatus, SystemVersion, Volume,
};
pub use replay::ReplayClient;

/// Manufacturer reported for every device this library talks to.
pub const MANUFACTURER: &str = "Western Digital";

/// Creates a client for the backend named by `credentials.host`.
///
/// `file://` hosts select the [`ReplayClient`]. The returned client is not
/// open yet.
pub fn connect(credentials: Credentials) -> Result<Box<dyn NasApi>> {
    if let Some(path) = credentials.host.strip_prefix(replay::SCHEME) {
        return Ok(Box::new(ReplayClient::new(path, &credentials)));
    }
    Err(Error::UnsupportedHost(credentials.host))
}
