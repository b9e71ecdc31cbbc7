//! Shared types for pcmio.
//!
//! This crate defines the plain data exchanged between the device layer
//! and backend drivers: sample formats, device identity, capability
//! snapshots, stream configuration and lifecycle states.

mod config;
mod format;
mod state;
mod types;

pub use config::{
    AlsaDeviceConfig, Channel, ChannelMap, DeviceConfig, Negotiation, PerformanceProfile,
    PulseDeviceConfig, ShareMode, CONSERVATIVE_PERIOD_MS, DEFAULT_CHANNELS, DEFAULT_PERIODS,
    DEFAULT_SAMPLE_RATE, LOW_LATENCY_PERIOD_MS, MAX_BUFFER_FRAMES, MAX_CHANNELS, MAX_SAMPLE_RATE,
    MIN_SAMPLE_RATE,
};
pub use format::{sample_size_in_bytes, BackendKind, DeviceType, FormatType};
pub use state::{ContextState, DeviceState};
pub use types::{
    truncate_device_name, DeviceId, DeviceInfo, DEVICE_ID_LEN, MAX_DEVICE_NAME_LEN,
};
