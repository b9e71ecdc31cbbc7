//! Error types for backend drivers.

use pcmio_types::BackendKind;
use thiserror::Error;

/// Errors reported by backend drivers and their streams.
#[derive(Debug, Error)]
pub enum BackendError {
    /// No driver for this backend is available in this build or on this system.
    #[error("Backend unavailable: {0}")]
    Unavailable(BackendKind),

    /// The driver was found but failed to initialize.
    #[error("{kind} initialization failed: {message}")]
    Init { kind: BackendKind, message: String },

    /// The requested device ID is unknown to the backend.
    #[error("Audio device not found")]
    DeviceNotFound,

    /// The backend cannot honor a requested setting.
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// Stream start/stop failure.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Device enumeration failed.
    #[error("Enumeration failed: {0}")]
    Enumeration(String),

    /// Native driver failure code.
    #[error("Native error {code}: {message}")]
    Native { code: i32, message: String },
}
