//! Resolving a requested config against device capabilities.

use pcmio_types::{
    DeviceConfig, DeviceInfo, DeviceType, FormatType, Negotiation, DEFAULT_CHANNELS,
    DEFAULT_PERIODS, DEFAULT_SAMPLE_RATE, MAX_BUFFER_FRAMES, MAX_CHANNELS, MAX_SAMPLE_RATE,
    MIN_SAMPLE_RATE,
};
use tracing::debug;

use crate::error::DeviceError;
use crate::DeviceResult;

/// Formats to try, best first, when `requested` is not available.
fn format_preference(requested: FormatType) -> [FormatType; 5] {
    use FormatType::*;
    match requested {
        U8 => [U8, S16, S24, S32, F32],
        S16 => [S16, S24, S32, F32, U8],
        S24 => [S24, S32, F32, S16, U8],
        S32 => [S32, F32, S24, S16, U8],
        F32 => [F32, S32, S24, S16, U8],
    }
}

/// Clamp without panicking on an inverted range.
fn clamp(value: u32, min: u32, max: u32) -> u32 {
    value.max(min).min(max)
}

/// Produce the concrete config a stream will be opened with.
///
/// Zero channels or sample rate take the device's native value. Unsupported
/// values fail with [`DeviceError::InvalidConfig`] under
/// [`Negotiation::Strict`] and are moved to the nearest supported value
/// under [`Negotiation::Nearest`]. The result always has a non-zero period
/// size and period count, and a transfer buffer of at most
/// [`MAX_BUFFER_FRAMES`] frames.
pub fn negotiate(
    device_type: DeviceType,
    info: &DeviceInfo,
    requested: &DeviceConfig,
) -> DeviceResult<DeviceConfig> {
    let nearest = requested.negotiation == Negotiation::Nearest;
    let mut config = requested.clone();

    if !info.supports_format(config.format) {
        let fallback = format_preference(config.format)
            .into_iter()
            .find(|format| info.supports_format(*format));

        match fallback {
            Some(format) if nearest => {
                debug!(requested = %config.format, chosen = %format, "Format fallback");
                config.format = format;
            }
            _ => {
                return Err(DeviceError::InvalidConfig(format!(
                    "{} format {} not supported by {}",
                    device_type, config.format, info.name
                )))
            }
        }
    }

    if config.channels == 0 {
        config.channels = clamp(DEFAULT_CHANNELS, info.min_channels, info.max_channels);
    } else if config.channels > MAX_CHANNELS {
        return Err(DeviceError::InvalidConfig(format!(
            "{} channels exceeds the limit of {}",
            config.channels, MAX_CHANNELS
        )));
    } else if !info.supports_channels(config.channels) {
        if !nearest {
            return Err(DeviceError::InvalidConfig(format!(
                "{} channels not supported by {} ({}..={})",
                config.channels, info.name, info.min_channels, info.max_channels
            )));
        }
        let chosen = clamp(config.channels, info.min_channels, info.max_channels);
        debug!(requested = config.channels, chosen, "Channel count fallback");
        config.channels = chosen;
    }

    if config.sample_rate == 0 {
        config.sample_rate = clamp(
            DEFAULT_SAMPLE_RATE,
            info.min_sample_rate,
            info.max_sample_rate,
        );
    } else if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&config.sample_rate) {
        return Err(DeviceError::InvalidConfig(format!(
            "sample rate {} outside {}..={}",
            config.sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
        )));
    } else if !info.supports_sample_rate(config.sample_rate) {
        if !nearest {
            return Err(DeviceError::InvalidConfig(format!(
                "sample rate {} not supported by {} ({}..={})",
                config.sample_rate, info.name, info.min_sample_rate, info.max_sample_rate
            )));
        }
        let chosen = clamp(
            config.sample_rate,
            info.min_sample_rate,
            info.max_sample_rate,
        );
        debug!(requested = config.sample_rate, chosen, "Sample rate fallback");
        config.sample_rate = chosen;
    }

    // Device ranges can be degenerate; the global limits still hold.
    if !(1..=MAX_CHANNELS).contains(&config.channels) {
        return Err(DeviceError::InvalidConfig(format!(
            "{} reports no usable channel count",
            info.name
        )));
    }
    if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&config.sample_rate) {
        return Err(DeviceError::InvalidConfig(format!(
            "{} reports no usable sample rate",
            info.name
        )));
    }

    if let Some(map) = &config.channel_map {
        if map.len() != config.channels as usize {
            return Err(DeviceError::InvalidConfig(format!(
                "channel map has {} positions for {} channels",
                map.len(),
                config.channels
            )));
        }
        if !map.is_valid() {
            return Err(DeviceError::InvalidConfig(
                "channel map repeats a position".to_string(),
            ));
        }
    }

    if config.buffer_size_in_frames == 0 {
        config.buffer_size_in_frames = config
            .performance_profile
            .period_size_in_frames(config.sample_rate);
    }
    if config.periods == 0 {
        config.periods = DEFAULT_PERIODS;
    }

    match config.buffer_size_in_frames.checked_mul(config.periods) {
        Some(frames) if frames <= MAX_BUFFER_FRAMES => {}
        _ => {
            return Err(DeviceError::InvalidConfig(format!(
                "{} periods of {} frames exceeds the limit of {} frames",
                config.periods, config.buffer_size_in_frames, MAX_BUFFER_FRAMES
            )))
        }
    }

    debug!(
        format = %config.format,
        channels = config.channels,
        sample_rate = config.sample_rate,
        period_frames = config.buffer_size_in_frames,
        periods = config.periods,
        "Negotiated device config"
    );

    Ok(config)
}
