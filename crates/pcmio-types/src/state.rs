//! Lifecycle state machine types.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a device.
///
/// ```text
/// Uninitialized --init--> Initialized --start--> Started
///       ^                   |     ^                 |
///       +------uninit-------+     +------stop-------+
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeviceState {
    /// No backend stream is bound.
    #[default]
    Uninitialized = 0,

    /// A stream is open but not delivering callbacks.
    Initialized = 1,

    /// The backend thread is delivering callbacks.
    Started = 2,
}

impl DeviceState {
    /// Decode from the atomic representation. Unknown values map to
    /// `Uninitialized`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Initialized,
            2 => Self::Started,
            _ => Self::Uninitialized,
        }
    }

    /// Encode for atomic storage.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns true once init has succeeded and until uninit.
    pub fn is_initialized(self) -> bool {
        !matches!(self, Self::Uninitialized)
    }

    /// Returns true while callbacks are being delivered.
    pub fn is_started(self) -> bool {
        matches!(self, Self::Started)
    }

    /// Returns a simple string representation of the state.
    pub fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::Initialized => "Initialized",
            Self::Started => "Started",
        }
    }
}

/// Lifecycle state of a context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextState {
    /// No backend is loaded.
    #[default]
    Uninitialized,

    /// One backend is loaded and active.
    Initialized,
}

impl ContextState {
    /// Returns true if a backend is loaded.
    pub fn is_initialized(self) -> bool {
        matches!(self, Self::Initialized)
    }
}
