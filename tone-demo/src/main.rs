//! Plays a sine tone on the default playback device.
//!
//! Usage: `pcmio-tone [seconds] [frequency_hz]`

use std::f32::consts::TAU;
use std::time::Duration;

use anyhow::{Context as _, Result};
use pcmio_device::{
    BackendKind, Context, ContextConfig, Device, DeviceConfig, DeviceType, FormatType,
    SampleSource,
};
use tracing::{info, warn};

const DEFAULT_SECONDS: u64 = 2;
const DEFAULT_FREQUENCY: f32 = 440.0;
const AMPLITUDE: f32 = 0.2;

/// Sine oscillator writing any sample format.
struct Tone {
    format: FormatType,
    channels: usize,
    phase: f32,
    step: f32,
}

impl Tone {
    fn new(format: FormatType, channels: u32, sample_rate: u32, frequency: f32) -> Self {
        Self {
            format,
            channels: channels as usize,
            phase: 0.0,
            step: TAU * frequency / sample_rate as f32,
        }
    }
}

/// Encode one sample in `[-1, 1]` as native-endian `format` into `out`,
/// which is one sample wide.
fn encode_sample(format: FormatType, value: f32, out: &mut [u8]) {
    let value = value.clamp(-1.0, 1.0);
    match format {
        FormatType::U8 => out[0] = ((value * 127.0) + 128.0) as u8,
        FormatType::S16 => out.copy_from_slice(&((value * i16::MAX as f32) as i16).to_ne_bytes()),
        FormatType::S24 => {
            let bytes = ((value * 8_388_607.0) as i32).to_ne_bytes();
            if cfg!(target_endian = "big") {
                out.copy_from_slice(&bytes[1..]);
            } else {
                out.copy_from_slice(&bytes[..3]);
            }
        }
        FormatType::S32 => out.copy_from_slice(&((value * i32::MAX as f32) as i32).to_ne_bytes()),
        FormatType::F32 => out.copy_from_slice(&value.to_ne_bytes()),
    }
}

impl SampleSource for Tone {
    fn read_frames(&mut self, frame_count: u32, out: &mut [u8]) -> u32 {
        let sample_size = self.format.bytes_per_sample() as usize;
        let frame_size = sample_size * self.channels;
        if frame_size == 0 {
            return 0;
        }

        let frames = (frame_count as usize).min(out.len() / frame_size);
        for frame in out.chunks_exact_mut(frame_size).take(frames) {
            let value = self.phase.sin() * AMPLITUDE;
            for sample in frame.chunks_exact_mut(sample_size) {
                encode_sample(self.format, value, sample);
            }
            self.phase = (self.phase + self.step) % TAU;
        }

        frames as u32
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pcmio=info,pcmio_device=info,pcmio_backend=info".into()),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let seconds = match args.next() {
        Some(arg) => arg.parse().context("seconds must be a whole number")?,
        None => DEFAULT_SECONDS,
    };
    let frequency = match args.next() {
        Some(arg) => arg.parse().context("frequency must be a number")?,
        None => DEFAULT_FREQUENCY,
    };

    let config = ContextConfig::with_log(|message: &str| {
        info!(target: "pcmio::driver", "{}", message);
    });
    let mut context = Context::new();
    context
        .init(&[], config)
        .context("failed to initialize audio context")?;

    if let Some(kind) = context.backend_kind() {
        info!(backend = %kind, "Audio context ready");
        if kind == BackendKind::Null {
            warn!("No hardware backend available; the tone will not be audible");
        }
    }

    for info in context.enumerate_devices(DeviceType::Playback)? {
        info!(
            "Playback device: {} (channels {}..={}, {}..={} Hz)",
            info.name, info.min_channels, info.max_channels, info.min_sample_rate, info.max_sample_rate
        );
    }

    let mut device = Device::new();
    device
        .init(&context, DeviceType::Playback, None, DeviceConfig::default_playback())
        .context("failed to open the default playback device")?;

    let format = device.format().context("device has no format")?;
    let channels = device.channels().context("device has no channel count")?;
    let sample_rate = device.sample_rate().context("device has no sample rate")?;
    info!(%format, channels, sample_rate, frequency, seconds, "Playing tone");

    let mut tone = Tone::new(format, channels, sample_rate, frequency);
    device.set_send_callback(move |frames, out| tone.read_frames(frames, out))?;
    device.set_stop_callback(|| info!("Playback stopped"))?;

    device.start().context("failed to start playback")?;
    std::thread::sleep(Duration::from_secs(seconds));
    device.stop()?;

    let stats = device.stats();
    info!(
        callbacks = stats.callbacks,
        frames = stats.frames_transferred,
        underruns = stats.underruns,
        "Playback finished"
    );

    device.uninit();
    context.uninit()?;
    Ok(())
}
