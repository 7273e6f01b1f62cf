//! Error types for the My Cloud client library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the NAS.
#[derive(Error, Debug)]
pub enum Error {
    /// No bundled backend understands the configured host.
    #[error("Unsupported NAS host: {0}")]
    UnsupportedHost(String),

    /// An endpoint was called before `open()` or after `close()`.
    #[error("Client is not open")]
    NotOpen,

    /// Reading the backing source failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The endpoint payload could not be decoded.
    #[error("Malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The endpoint payload lacks a section the caller asked for.
    #[error("Endpoint {0} returned no data")]
    MissingField(&'static str),

    /// The device rejected or failed a request.
    #[error("Request failed: {0}")]
    Request(String),
}
