//! Daemon error types.

use thiserror::Error;

/// A fetch cycle failed; carries the text of the endpoint error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Error fetching data: {0}")]
pub struct UpdateFailed(pub String);

impl From<mycloud_nas::Error> for UpdateFailed {
    fn from(err: mycloud_nas::Error) -> Self {
        Self(err.to_string())
    }
}

/// Integration startup failed.
#[derive(Error, Debug)]
pub enum SetupError {
    /// The client could not be created or opened.
    #[error("Failed to open NAS client: {0}")]
    Client(#[from] mycloud_nas::Error),

    /// The first fetch cycle failed, so no entities were created.
    #[error("Initial refresh failed: {0}")]
    InitialRefresh(#[from] UpdateFailed),
}
