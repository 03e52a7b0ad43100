//! Error types for the ILI9xxx panel driver.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when driving the panel.
#[derive(Error, Debug)]
pub enum Error {
    /// The frame buffer could not be allocated.
    #[error("Failed to allocate {bytes} byte frame buffer: {source}")]
    Allocation {
        bytes: usize,
        #[source]
        source: std::collections::TryReserveError,
    },

    /// The frame buffer exceeds the configured memory limit.
    #[error("Frame buffer of {bytes} bytes exceeds limit of {limit} bytes")]
    BufferTooLarge { bytes: usize, limit: usize },

    /// The driver is permanently failed after an earlier fatal error.
    #[error("Display driver is in the failed state")]
    Failed,

    /// Transport failure reported by the bus.
    #[error("Bus error: {0}")]
    Bus(String),

    /// I/O error from a host-side transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid color mode name.
    #[error("Invalid color mode: {0}")]
    InvalidColorMode(String),

    /// Unknown panel model name.
    #[error("Unknown panel model: {0}")]
    InvalidModel(String),

    /// Invalid rotation value.
    #[error("Invalid rotation: {0}")]
    InvalidRotation(String),

    /// Malformed initialization table.
    #[error("Malformed init table at offset {offset}")]
    InitTable { offset: usize },

    /// Source pixel block is shorter than its geometry requires.
    #[error("Pixel block size mismatch: expected at least {expected}, got {actual}")]
    BlockSize { expected: usize, actual: usize },

    /// PNG encoding error.
    #[error("PNG error: {0}")]
    Png(#[from] png::EncodingError),
}
