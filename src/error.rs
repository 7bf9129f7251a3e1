//! # Error Types
//!
//! Custom error types for ESC telemetry using `thiserror`.

use thiserror::Error;

/// Main error type for ESC telemetry
#[derive(Debug, Error)]
pub enum EscTelemetryError {
    /// Frame checksum did not match the transmitted CRC byte
    #[error("checksum mismatch: computed {computed:#04x}, received {received:#04x}")]
    ChecksumMismatch { computed: u8, received: u8 },

    /// Frame was shorter than the protocol requires
    #[error("truncated frame: got {got} bytes, expected {expected}")]
    TruncatedFrame { got: usize, expected: usize },

    /// Serial port errors
    #[error("serial port error: {0}")]
    Serial(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ESC telemetry
pub type Result<T> = std::result::Result<T, EscTelemetryError>;
