//! Error types for the ZAF controller
//!
//! Provides a unified error type for all operations.

use std::string::FromUtf8Error;

use thiserror::Error;

/// Result type alias using ZafError
pub type Result<T> = std::result::Result<T, ZafError>;

/// Unified error type for ZAF controller operations
#[derive(Debug, Error)]
pub enum ZafError {
    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Failed to open {port}: {source}")]
    TransportOpen {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Not connected to controller")]
    NotConnected,

    #[error("Write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("Read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("Timed out waiting for a response line")]
    ReadTimeout,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Response is not valid UTF-8: {0}")]
    Decode(#[from] FromUtf8Error),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // -------------------------------------------------------------------------
    // Service Errors
    // -------------------------------------------------------------------------
    #[error("Device worker is not running")]
    WorkerUnavailable,
}

impl ZafError {
    /// Whether this error means the transport can no longer be trusted.
    ///
    /// The controller drops its connection when one of these is returned.
    pub fn is_io_failure(&self) -> bool {
        matches!(self, ZafError::Write(_) | ZafError::Read(_))
    }
}
