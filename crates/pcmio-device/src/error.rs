//! Error types for context and device operations.

use pcmio_backend::BackendError;
use thiserror::Error;

/// Errors returned by context and device lifecycle operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No backend in the preference list could be initialized.
    #[error("No audio backend available")]
    NoBackendAvailable,

    /// Unsupported format, channel count, sample rate or layout.
    #[error("Invalid device config: {0}")]
    InvalidConfig(String),

    /// The context or device has not been initialized.
    #[error("Not initialized")]
    NotInitialized,

    /// The requested transition conflicts with the current state.
    #[error("Device busy: {0}")]
    DeviceBusy(String),

    /// Native driver failure.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Device enumeration failed.
    #[error("Device enumeration failed: {0}")]
    EnumerationFailed(String),
}
