//! Sample formats, stream directions and backend kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// PCM sample format.
///
/// Samples are always interleaved and native-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatType {
    /// Unsigned 8-bit integer.
    U8,

    /// Signed 16-bit integer.
    S16,

    /// Signed 24-bit integer, tightly packed (3 bytes per sample).
    S24,

    /// Signed 32-bit integer.
    S32,

    /// 32-bit IEEE float.
    F32,
}

impl FormatType {
    /// Every format, from narrowest to widest.
    pub const ALL: [FormatType; 5] = [Self::U8, Self::S16, Self::S24, Self::S32, Self::F32];

    /// Size in bytes of a single sample of this format.
    pub const fn bytes_per_sample(self) -> u32 {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S24 => 3,
            Self::S32 | Self::F32 => 4,
        }
    }

    /// Size in bytes of one frame of `channels` samples.
    pub const fn bytes_per_frame(self, channels: u32) -> u32 {
        self.bytes_per_sample() * channels
    }

    /// Short display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S24 => "s24",
            Self::S32 => "s32",
            Self::F32 => "f32",
        }
    }
}

impl fmt::Display for FormatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Size in bytes of one sample of `format`.
pub const fn sample_size_in_bytes(format: FormatType) -> u32 {
    format.bytes_per_sample()
}

/// Direction of a device stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    /// Output: the application sends samples to the device.
    Playback,

    /// Input: the device delivers captured samples to the application.
    Capture,
}

impl DeviceType {
    /// Returns true for playback streams.
    pub fn is_playback(self) -> bool {
        matches!(self, Self::Playback)
    }

    /// Returns true for capture streams.
    pub fn is_capture(self) -> bool {
        matches!(self, Self::Capture)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Playback => f.write_str("playback"),
            Self::Capture => f.write_str("capture"),
        }
    }
}

/// A platform audio driver integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    Wasapi,
    DirectSound,
    WinMm,
    Alsa,
    Oss,
    OpenSl,
    OpenAl,
    /// Always-available backend with no real hardware behind it.
    Null,
}

impl BackendKind {
    /// Order tried when the application passes no preference.
    pub const DEFAULT_ORDER: [BackendKind; 8] = [
        Self::Wasapi,
        Self::DirectSound,
        Self::WinMm,
        Self::Alsa,
        Self::Oss,
        Self::OpenSl,
        Self::OpenAl,
        Self::Null,
    ];

    /// Returns the display name for this backend.
    pub fn name(self) -> &'static str {
        match self {
            Self::Wasapi => "WASAPI",
            Self::DirectSound => "DirectSound",
            Self::WinMm => "WinMM",
            Self::Alsa => "ALSA",
            Self::Oss => "OSS",
            Self::OpenSl => "OpenSL|ES",
            Self::OpenAl => "OpenAL",
            Self::Null => "Null",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
