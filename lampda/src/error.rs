//! Error types for lampda.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for lampda operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for lampda operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (serial port, file operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serial port error.
    #[cfg(feature = "native")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Malformed reply from a lamp.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The remote API quota is too low to risk another request.
    #[error("Release catalog rate limit reached ({remaining} requests left), try again later")]
    RateLimited {
        /// Remaining request budget reported by the catalog.
        remaining: u64,
    },

    /// Transport or HTTP status failure while talking to the catalog.
    #[error("Network error: {0}")]
    Network(String),

    /// The catalog answered with something that is not a release list.
    #[error("Invalid catalog response: {0}")]
    Catalog(String),

    /// No release is available.
    #[error("No firmware release available")]
    EmptyCatalog,

    /// The lamp could not be switched into bootloader mode.
    #[error("Failed to reset the lamp into update mode: {0}")]
    ResetFailed(String),

    /// The bootloader drive did not show up.
    #[error("USB drive '{0}' not found")]
    DriveNotFound(String),

    /// The release does not carry exactly one asset for the lamp type.
    #[error("Expected exactly one firmware file for lamp type '{lamp_type}', found {matches}")]
    AssetResolution {
        /// Lamp type token used for matching.
        lamp_type: String,
        /// Number of matching assets.
        matches: usize,
    },

    /// A local firmware file does not exist.
    #[error("Firmware file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Copying the firmware onto the bootloader drive failed.
    #[error("Failed to copy firmware to the lamp: {0}")]
    CopyFailed(String),

    /// Unsupported platform or operation.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
