//! Device identity and capability snapshots.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::format::FormatType;

/// Capacity of a [`DeviceId`] in bytes.
pub const DEVICE_ID_LEN: usize = 128;

/// Maximum length of a device name in bytes.
pub const MAX_DEVICE_NAME_LEN: usize = 255;

/// Opaque backend-specific device identifier.
///
/// Applications obtain IDs from enumeration only. Backends build them with
/// [`DeviceId::from_backend_bytes`]; input longer than [`DEVICE_ID_LEN`] is
/// truncated.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId {
    bytes: [u8; DEVICE_ID_LEN],
    len: u8,
}

impl DeviceId {
    /// Build an ID from raw backend bytes, truncating to [`DEVICE_ID_LEN`].
    pub fn from_backend_bytes(raw: &[u8]) -> Self {
        let len = raw.len().min(DEVICE_ID_LEN);
        let mut bytes = [0u8; DEVICE_ID_LEN];
        bytes[..len].copy_from_slice(&raw[..len]);

        Self {
            bytes,
            len: len as u8,
        }
    }

    /// The significant bytes of this ID.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl fmt::Debug for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeviceId({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl Serialize for DeviceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_bytes().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<u8>::deserialize(deserializer)?;
        Ok(Self::from_backend_bytes(&raw))
    }
}

/// Truncate `name` to at most [`MAX_DEVICE_NAME_LEN`] bytes on a char boundary.
pub fn truncate_device_name(name: &str) -> String {
    if name.len() <= MAX_DEVICE_NAME_LEN {
        return name.to_string();
    }

    let mut end = MAX_DEVICE_NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    name[..end].to_string()
}

/// Snapshot of a device's identity and capabilities.
///
/// Stale as soon as the hardware changes; enumerate again to refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Backend identifier.
    pub id: DeviceId,

    /// Human-readable name, at most [`MAX_DEVICE_NAME_LEN`] bytes.
    pub name: String,

    /// Supported sample formats, without duplicates.
    pub formats: Vec<FormatType>,

    /// Minimum channel count.
    pub min_channels: u32,

    /// Maximum channel count.
    pub max_channels: u32,

    /// Minimum sample rate in Hz.
    pub min_sample_rate: u32,

    /// Maximum sample rate in Hz.
    pub max_sample_rate: u32,
}

impl DeviceInfo {
    /// Create a snapshot, truncating the name and dropping duplicate formats.
    pub fn new(
        id: DeviceId,
        name: &str,
        formats: &[FormatType],
        channels: (u32, u32),
        sample_rates: (u32, u32),
    ) -> Self {
        let mut unique = Vec::with_capacity(formats.len());
        for format in formats {
            if !unique.contains(format) {
                unique.push(*format);
            }
        }

        Self {
            id,
            name: truncate_device_name(name),
            formats: unique,
            min_channels: channels.0,
            max_channels: channels.1,
            min_sample_rate: sample_rates.0,
            max_sample_rate: sample_rates.1,
        }
    }

    /// Check if a format is advertised.
    pub fn supports_format(&self, format: FormatType) -> bool {
        self.formats.contains(&format)
    }

    /// Check if a channel count is within the advertised range.
    pub fn supports_channels(&self, channels: u32) -> bool {
        (self.min_channels..=self.max_channels).contains(&channels)
    }

    /// Check if a sample rate is within the advertised range.
    pub fn supports_sample_rate(&self, rate: u32) -> bool {
        (self.min_sample_rate..=self.max_sample_rate).contains(&rate)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}-{} ch, {}-{} Hz)",
            self.name, self.min_channels, self.max_channels, self.min_sample_rate, self.max_sample_rate
        )
    }
}
