//! Audio context and device lifecycle.
//!
//! A [`Context`] loads one backend, chosen from a preference list. A
//! [`Device`] opened through it negotiates a [`DeviceConfig`] against the
//! device's capabilities and streams interleaved PCM through handlers that
//! run on the backend's audio thread.
//!
//! ```no_run
//! use pcmio_device::{BackendKind, Context, ContextConfig, DeviceCallbacks, DeviceConfig, DeviceType};
//!
//! # fn main() -> pcmio_device::DeviceResult<()> {
//! let mut context = Context::new();
//! context.init(&[BackendKind::Null], ContextConfig::default())?;
//!
//! let callbacks = DeviceCallbacks::new().on_send(|frames, out| {
//!     out.fill(0);
//!     frames
//! });
//! let mut device = context.init_device(
//!     DeviceType::Playback,
//!     None,
//!     DeviceConfig::default_playback(),
//!     callbacks,
//! )?;
//!
//! device.start()?;
//! device.stop()?;
//! device.uninit();
//! context.uninit()?;
//! # Ok(())
//! # }
//! ```

mod callbacks;
mod context;
mod device;
mod error;
mod negotiate;
mod stream;

#[cfg(test)]
mod fake;

pub use callbacks::DeviceCallbacks;
pub use context::{Context, DeviceIter};
pub use device::Device;
pub use error::DeviceError;
pub use negotiate::negotiate;
pub use stream::{
    CapturedChunk, ChannelSink, ReaderSource, SampleSink, SampleSource, CAPTURE_CHANNEL_CAPACITY,
};

pub use pcmio_backend::{
    AlsaContextConfig, BackendError, ContextConfig, DriverRegistry, LogProc, PulseContextConfig,
    StatsSnapshot, ThreadPriority,
};
pub use pcmio_types::*;

/// Result type for context and device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_null_backend_playback_round_trip() {
        let mut context = Context::new();
        context.init(&[BackendKind::Null], ContextConfig::default()).unwrap();

        let source = ReaderSource::new(std::io::repeat(0), FormatType::S16, 2);
        let mut device = context
            .init_device(
                DeviceType::Playback,
                None,
                DeviceConfig::playback(FormatType::S16, 2, 48_000),
                DeviceCallbacks::from_source(source),
            )
            .unwrap();

        device.start().unwrap();
        std::thread::sleep(Duration::from_millis(30));
        device.stop().unwrap();

        let stats = device.stats();
        assert!(stats.callbacks >= 1);
        assert_eq!(stats.underruns, 0);

        device.uninit();
        context.uninit().unwrap();
    }

    #[test]
    fn test_null_backend_capture_into_channel() {
        let mut context = Context::new();
        context.init(&[BackendKind::Null], ContextConfig::default()).unwrap();

        let (sink, chunks) = ChannelSink::new(CAPTURE_CHANNEL_CAPACITY);
        let config = DeviceConfig {
            buffer_size_in_frames: 160,
            ..DeviceConfig::capture(FormatType::F32, 1, 16_000)
        };
        let mut device = context
            .init_device(DeviceType::Capture, None, config, DeviceCallbacks::from_sink(sink))
            .unwrap();

        device.start().unwrap();
        let chunk = chunks.recv_timeout(Duration::from_secs(1)).unwrap();
        device.stop().unwrap();

        assert_eq!(chunk.sequence, 0);
        assert_eq!(chunk.frames, 160);
        assert_eq!(chunk.data.len(), 160 * 4);
        assert!(chunk.data.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_null_backend_worker_panic_still_notifies() {
        let mut context = Context::new();
        context.init(&[BackendKind::Null], ContextConfig::default()).unwrap();

        let stops = Arc::new(AtomicU32::new(0));
        let stops_in = Arc::clone(&stops);
        let mut calls = 0;
        let callbacks = DeviceCallbacks::new()
            .on_send(move |frames, _| {
                calls += 1;
                assert!(calls == 1, "send handler failed");
                frames
            })
            .on_stop(move || {
                stops_in.fetch_add(1, Ordering::SeqCst);
            });
        let config = DeviceConfig {
            buffer_size_in_frames: 160,
            ..DeviceConfig::playback(FormatType::S16, 1, 16_000)
        };
        let mut device = context
            .init_device(DeviceType::Playback, None, config, callbacks)
            .unwrap();

        device.start().unwrap();
        std::thread::sleep(Duration::from_millis(100));

        assert!(matches!(device.stop(), Err(DeviceError::Backend(_))));
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert_eq!(device.state(), DeviceState::Initialized);

        device.uninit();
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        context.uninit().unwrap();
    }
}
