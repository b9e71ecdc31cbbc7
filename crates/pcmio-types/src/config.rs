//! Device configuration.

use serde::{Deserialize, Serialize};

use crate::format::FormatType;

/// Lowest sample rate a device may be configured with.
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Highest sample rate a device may be configured with.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Highest channel count a device may be configured with.
pub const MAX_CHANNELS: u32 = 32;

/// Largest transfer buffer, in frames, across all periods.
pub const MAX_BUFFER_FRAMES: u32 = 1 << 20;

/// Periods used when the config leaves `periods` at zero.
pub const DEFAULT_PERIODS: u32 = 2;

/// Channel count picked for "device native" when the device allows it.
pub const DEFAULT_CHANNELS: u32 = 2;

/// Sample rate picked for "device native" when the device allows it.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Period length in milliseconds for [`PerformanceProfile::LowLatency`].
pub const LOW_LATENCY_PERIOD_MS: u32 = 10;

/// Period length in milliseconds for [`PerformanceProfile::Conservative`].
pub const CONSERVATIVE_PERIOD_MS: u32 = 50;

/// Whether the device is shared with other applications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShareMode {
    /// Mixed with other applications by the OS.
    #[default]
    Shared,

    /// Exclusive access to the hardware.
    Exclusive,
}

/// Buffer sizing strategy used when no explicit size is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceProfile {
    /// Small periods, lower latency, higher glitch risk.
    #[default]
    LowLatency,

    /// Larger periods for stability.
    Conservative,
}

impl PerformanceProfile {
    /// Period length in milliseconds.
    pub fn period_ms(self) -> u32 {
        match self {
            Self::LowLatency => LOW_LATENCY_PERIOD_MS,
            Self::Conservative => CONSERVATIVE_PERIOD_MS,
        }
    }

    /// Frames per period at `sample_rate`, never less than one.
    pub fn period_size_in_frames(self, sample_rate: u32) -> u32 {
        let frames = (u64::from(sample_rate) * u64::from(self.period_ms()) / 1000) as u32;
        frames.max(1)
    }
}

/// What to do when the requested format, channels or rate is unsupported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Negotiation {
    /// Reject the config.
    #[default]
    Strict,

    /// Fall back to the closest value the device advertises.
    Nearest,
}

/// Speaker position of one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Mono,
    FrontLeft,
    FrontRight,
    FrontCenter,
    Lfe,
    BackLeft,
    BackRight,
    FrontLeftCenter,
    FrontRightCenter,
    BackCenter,
    SideLeft,
    SideRight,
    TopCenter,
    TopFrontLeft,
    TopFrontCenter,
    TopFrontRight,
    TopBackLeft,
    TopBackCenter,
    TopBackRight,
    /// Channel without a speaker position.
    Aux(u8),
}

/// Ordered channel positions, one per interleaved sample in a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMap(pub Vec<Channel>);

impl ChannelMap {
    /// The conventional layout for `channels` channels.
    pub fn default_for(channels: u32) -> Self {
        use Channel::*;

        let named: &[Channel] = match channels {
            0 => &[],
            1 => &[Mono],
            2 => &[FrontLeft, FrontRight],
            3 => &[FrontLeft, FrontRight, FrontCenter],
            4 => &[FrontLeft, FrontRight, BackLeft, BackRight],
            5 => &[FrontLeft, FrontRight, FrontCenter, BackLeft, BackRight],
            6 => &[FrontLeft, FrontRight, FrontCenter, Lfe, BackLeft, BackRight],
            7 => &[FrontLeft, FrontRight, FrontCenter, Lfe, BackCenter, SideLeft, SideRight],
            _ => &[FrontLeft, FrontRight, FrontCenter, Lfe, BackLeft, BackRight, SideLeft, SideRight],
        };

        let mut map = named.to_vec();
        let mut aux = 0u8;
        while (map.len() as u32) < channels {
            map.push(Aux(aux));
            aux = aux.wrapping_add(1);
        }
        Self(map)
    }

    /// Number of channels described.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if no position appears twice.
    pub fn is_valid(&self) -> bool {
        self.0
            .iter()
            .enumerate()
            .all(|(i, channel)| !self.0[i + 1..].contains(channel))
    }
}

/// ALSA-specific hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlsaDeviceConfig {
    /// Disable memory-mapped transfers.
    pub no_mmap: bool,
}

/// PulseAudio-specific hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseDeviceConfig {
    /// Stream name shown by the sound server.
    pub stream_name: Option<String>,
}

/// Requested stream parameters.
///
/// Zero `channels` or `sample_rate` means "use the device's native value".
/// `buffer_size_in_frames` is the period size: each callback delivers that
/// many frames, and the transfer buffer holds `periods` of them. Zero means
/// derive it from `performance_profile`.
///
/// Frozen once a device is initialized with it; changing it requires
/// re-initializing the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Sample format.
    pub format: FormatType,

    /// Channel count (0 = device native).
    pub channels: u32,

    /// Sample rate in Hz (0 = device native).
    pub sample_rate: u32,

    /// Optional speaker layout; must match `channels` when set.
    pub channel_map: Option<ChannelMap>,

    /// Frames per period (0 = derive from profile).
    pub buffer_size_in_frames: u32,

    /// Periods in the transfer buffer (0 = [`DEFAULT_PERIODS`]).
    pub periods: u32,

    /// Shared or exclusive device access.
    pub share_mode: ShareMode,

    /// Buffer sizing strategy.
    pub performance_profile: PerformanceProfile,

    /// Behavior for unsupported values.
    pub negotiation: Negotiation,

    /// ALSA hints.
    pub alsa: AlsaDeviceConfig,

    /// PulseAudio hints.
    pub pulse: PulseDeviceConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            format: FormatType::F32,
            channels: 0,
            sample_rate: 0,
            channel_map: None,
            buffer_size_in_frames: 0,
            periods: 0,
            share_mode: ShareMode::Shared,
            performance_profile: PerformanceProfile::LowLatency,
            negotiation: Negotiation::Strict,
            alsa: AlsaDeviceConfig::default(),
            pulse: PulseDeviceConfig::default(),
        }
    }
}

impl DeviceConfig {
    /// Config with explicit format, channel count and rate.
    pub fn new(format: FormatType, channels: u32, sample_rate: u32) -> Self {
        Self {
            format,
            channels,
            sample_rate,
            ..Default::default()
        }
    }

    /// Playback config preset.
    pub fn playback(format: FormatType, channels: u32, sample_rate: u32) -> Self {
        Self::new(format, channels, sample_rate)
    }

    /// Capture config preset.
    ///
    /// Capture favours stability over latency.
    pub fn capture(format: FormatType, channels: u32, sample_rate: u32) -> Self {
        Self {
            performance_profile: PerformanceProfile::Conservative,
            ..Self::new(format, channels, sample_rate)
        }
    }

    /// Device-native playback config that falls back instead of failing.
    pub fn default_playback() -> Self {
        Self {
            negotiation: Negotiation::Nearest,
            ..Default::default()
        }
    }

    /// Device-native capture config that falls back instead of failing.
    pub fn default_capture() -> Self {
        Self {
            performance_profile: PerformanceProfile::Conservative,
            negotiation: Negotiation::Nearest,
            ..Default::default()
        }
    }

    /// Size in bytes of one frame.
    pub fn bytes_per_frame(&self) -> u32 {
        self.format.bytes_per_frame(self.channels)
    }

    /// Frames held by the whole transfer buffer.
    ///
    /// Negotiated configs never exceed [`MAX_BUFFER_FRAMES`].
    pub fn transfer_size_in_frames(&self) -> u32 {
        self.buffer_size_in_frames.saturating_mul(self.periods)
    }

    /// Bytes held by the whole transfer buffer.
    pub fn transfer_size_in_bytes(&self) -> usize {
        self.transfer_size_in_frames() as usize * self.bytes_per_frame() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_size_from_profile() {
        assert_eq!(PerformanceProfile::LowLatency.period_size_in_frames(48_000), 480);
        assert_eq!(PerformanceProfile::Conservative.period_size_in_frames(44_100), 2205);
        assert_eq!(PerformanceProfile::LowLatency.period_size_in_frames(50), 1);
    }

    #[test]
    fn test_default_channel_maps() {
        assert_eq!(ChannelMap::default_for(1).0, vec![Channel::Mono]);
        assert_eq!(
            ChannelMap::default_for(2).0,
            vec![Channel::FrontLeft, Channel::FrontRight]
        );

        let wide = ChannelMap::default_for(10);
        assert_eq!(wide.len(), 10);
        assert_eq!(wide.0[8], Channel::Aux(0));
        assert_eq!(wide.0[9], Channel::Aux(1));
        assert!(wide.is_valid());
    }

    #[test]
    fn test_channel_map_rejects_duplicates() {
        let map = ChannelMap(vec![Channel::FrontLeft, Channel::FrontLeft]);
        assert!(!map.is_valid());
    }

    #[test]
    fn test_presets() {
        let capture = DeviceConfig::capture(FormatType::S16, 1, 16_000);
        assert_eq!(capture.performance_profile, PerformanceProfile::Conservative);
        assert_eq!(capture.negotiation, Negotiation::Strict);

        let native = DeviceConfig::default_playback();
        assert_eq!(native.channels, 0);
        assert_eq!(native.sample_rate, 0);
        assert_eq!(native.negotiation, Negotiation::Nearest);
    }

    #[test]
    fn test_transfer_size() {
        let config = DeviceConfig {
            buffer_size_in_frames: 256,
            periods: 3,
            ..DeviceConfig::new(FormatType::S24, 2, 48_000)
        };
        assert_eq!(config.transfer_size_in_frames(), 768);
        assert_eq!(config.transfer_size_in_bytes(), 768 * 6);
    }
}
