//! Dispatch from the backend's audio thread into application handlers.
//!
//! A backend thread owns a [`StreamIo`] while the stream runs and calls
//! [`CallbackRouter::send`] or [`CallbackRouter::recv`] once per period.
//! The router sizes the slice handed to the handler as
//! `frames * channels * bytes_per_sample` and forwards the handler's result
//! untouched. Send and recv take no locks and never keep the slice past
//! the call.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pcmio_types::{DeviceState, DeviceType, FormatType};

use crate::buffer::{silence_byte, TransferBuffer};
use crate::stats::StreamStats;

/// Playback handler: fill the slice with interleaved samples and return the
/// number of frames written.
pub type SendProc = Box<dyn FnMut(u32, &mut [u8]) -> u32 + Send>;

/// Capture handler: consume a slice of interleaved samples.
pub type RecvProc = Box<dyn FnMut(u32, &[u8]) + Send>;

/// Called once whenever a started stream stops.
pub type StopProc = Box<dyn FnMut() + Send>;

/// The handler slots of one device.
#[derive(Default)]
pub struct Handlers {
    /// Playback handler.
    pub send: Option<SendProc>,

    /// Capture handler.
    pub recv: Option<RecvProc>,

    /// Stop notification.
    pub stop: Option<StopProc>,
}

impl std::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers")
            .field("send", &self.send.is_some())
            .field("recv", &self.recv.is_some())
            .field("stop", &self.stop.is_some())
            .finish()
    }
}

#[derive(Default)]
struct StopSlot {
    handler: Option<StopProc>,
    armed: bool,
}

/// Stop notification that fires at most once per run.
///
/// Clones share one slot, so the device can still deliver the notification
/// when a backend fails to hand the I/O back.
#[derive(Clone, Default)]
pub struct StopSignal(Arc<Mutex<StopSlot>>);

impl StopSignal {
    /// Wrap a stop handler. The signal starts disarmed.
    pub fn new(handler: Option<StopProc>) -> Self {
        Self(Arc::new(Mutex::new(StopSlot {
            handler,
            armed: false,
        })))
    }

    /// Allow the next [`finish`](Self::finish) to fire.
    pub fn arm(&self) {
        self.0.lock().armed = true;
    }

    /// Fire the handler if armed, then disarm.
    ///
    /// Returns true if the handler slot was consulted.
    pub fn finish(&self) -> bool {
        let mut slot = self.0.lock();
        if !slot.armed {
            return false;
        }
        slot.armed = false;

        if let Some(handler) = slot.handler.as_mut() {
            handler();
        }
        true
    }

    /// Remove the handler, leaving the slot empty.
    pub fn take_handler(&self) -> Option<StopProc> {
        self.0.lock().handler.take()
    }
}

impl std::fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.0.lock();
        f.debug_struct("StopSignal")
            .field("handler", &slot.handler.is_some())
            .field("armed", &slot.armed)
            .finish()
    }
}

/// Routes backend callbacks to the handler matching the stream direction.
pub struct CallbackRouter {
    device_type: DeviceType,
    format: FormatType,
    channels: u32,
    handlers: Handlers,
    stop: StopSignal,
    stats: Arc<StreamStats>,
}

impl CallbackRouter {
    /// Create a router for a negotiated stream layout.
    pub fn new(
        device_type: DeviceType,
        format: FormatType,
        channels: u32,
        mut handlers: Handlers,
        stats: Arc<StreamStats>,
    ) -> Self {
        let stop = StopSignal::new(handlers.stop.take());
        Self {
            device_type,
            format,
            channels,
            handlers,
            stop,
            stats,
        }
    }

    /// Stream direction.
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Size in bytes of one frame.
    pub fn bytes_per_frame(&self) -> usize {
        self.format.bytes_per_frame(self.channels) as usize
    }

    /// Byte extent of `frame_count` frames.
    pub fn extent(&self, frame_count: u32) -> usize {
        frame_count as usize * self.channels as usize * self.format.bytes_per_sample() as usize
    }

    /// Frames of `frame_count` that fit in `len` bytes.
    fn fit(&self, frame_count: u32, len: usize) -> u32 {
        let bytes_per_frame = self.bytes_per_frame();
        if bytes_per_frame == 0 {
            return 0;
        }
        frame_count.min((len / bytes_per_frame) as u32)
    }

    /// Ask the send handler for `frame_count` frames.
    ///
    /// Returns the handler's frame count as-is; a short count means underrun.
    /// Capture streams and missing handlers produce zero frames.
    pub fn send(&mut self, frame_count: u32, buffer: &mut [u8]) -> u32 {
        if !self.device_type.is_playback() {
            return 0;
        }

        let frames = self.fit(frame_count, buffer.len());
        let extent = self.extent(frames);

        let produced = match self.handlers.send.as_mut() {
            Some(handler) => handler(frames, &mut buffer[..extent]),
            None => 0,
        };

        self.stats.record_callback(frames, produced);
        produced
    }

    /// Hand `frame_count` captured frames to the recv handler.
    ///
    /// Playback streams ignore the call.
    pub fn recv(&mut self, frame_count: u32, buffer: &[u8]) {
        if !self.device_type.is_capture() {
            return;
        }

        let frames = self.fit(frame_count, buffer.len());
        let extent = self.extent(frames);

        if let Some(handler) = self.handlers.recv.as_mut() {
            handler(frames, &buffer[..extent]);
        }

        self.stats.record_callback(frames, frames);
    }

    /// Arm the stop notification for a new run of the stream.
    pub fn arm(&mut self) {
        self.stop.arm();
    }

    /// Fire the stop handler if this run has not already done so.
    ///
    /// Returns true if the handler slot was consulted.
    pub fn finish(&mut self) -> bool {
        self.stop.finish()
    }

    /// A handle onto this router's stop notification.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Give the handler slots back to the device.
    pub fn into_handlers(self) -> Handlers {
        Handlers {
            stop: self.stop.take_handler(),
            ..self.handlers
        }
    }
}

/// Everything a backend thread needs while a stream runs.
///
/// Ownership moves into the backend on start and back to the device on stop.
pub struct StreamIo {
    /// Handler dispatch.
    pub router: CallbackRouter,

    /// Transfer buffer.
    pub buffer: TransferBuffer,
}

impl StreamIo {
    /// Bundle a router with its buffer.
    pub fn new(router: CallbackRouter, buffer: TransferBuffer) -> Self {
        Self { router, buffer }
    }

    /// Fill the whole transfer buffer from the send handler.
    ///
    /// Frames the handler did not produce stay silent.
    pub fn prefill(&mut self) -> u32 {
        let frames = self.buffer.frames();
        let produced = self.router.send(frames, self.buffer.as_mut_slice());

        let written = produced.min(frames) as usize * self.buffer.bytes_per_frame();
        if written < self.buffer.len() {
            let tail = &mut self.buffer.as_mut_slice()[written..];
            tail.fill(silence_byte(self.router.format));
        }
        produced
    }
}

/// Device state shared between the device and its backend thread.
#[derive(Debug, Clone, Default)]
pub struct StreamStatus(Arc<AtomicU8>);

impl StreamStatus {
    /// Create a status in the `Uninitialized` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn load(&self) -> DeviceState {
        DeviceState::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Overwrite the state.
    pub fn store(&self, state: DeviceState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Move `Started` to `Initialized`.
    ///
    /// Backends call this when a stream ends on its own. Returns false if
    /// the stream was not marked started.
    pub fn mark_stopped(&self) -> bool {
        self.0
            .compare_exchange(
                DeviceState::Started.as_u8(),
                DeviceState::Initialized.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn router(device_type: DeviceType, format: FormatType, channels: u32, handlers: Handlers) -> CallbackRouter {
        CallbackRouter::new(device_type, format, channels, handlers, Arc::new(StreamStats::new()))
    }

    #[test]
    fn test_send_extent_for_every_format() {
        for format in FormatType::ALL {
            let seen = Arc::new(AtomicU32::new(0));
            let seen_in = Arc::clone(&seen);
            let handlers = Handlers {
                send: Some(Box::new(move |frames: u32, out: &mut [u8]| {
                    seen_in.store(out.len() as u32, Ordering::SeqCst);
                    frames
                })),
                ..Default::default()
            };

            let mut router = router(DeviceType::Playback, format, 3, handlers);
            let mut buffer = vec![0u8; 4096];
            let produced = router.send(100, &mut buffer);

            assert_eq!(produced, 100);
            assert_eq!(seen.load(Ordering::SeqCst), 100 * 3 * format.bytes_per_sample());
        }
    }

    #[test]
    fn test_recv_extent() {
        let seen = Arc::new(AtomicU32::new(0));
        let seen_in = Arc::clone(&seen);
        let handlers = Handlers {
            recv: Some(Box::new(move |_: u32, input: &[u8]| {
                seen_in.store(input.len() as u32, Ordering::SeqCst);
            })),
            ..Default::default()
        };

        let mut router = router(DeviceType::Capture, FormatType::S24, 2, handlers);
        router.recv(64, &[0u8; 1024]);
        assert_eq!(seen.load(Ordering::SeqCst), 64 * 2 * 3);
    }

    #[test]
    fn test_short_send_is_forwarded_unmodified() {
        let handlers = Handlers {
            send: Some(Box::new(|_: u32, _: &mut [u8]| 7)),
            ..Default::default()
        };
        let stats = Arc::new(StreamStats::new());
        let mut router = CallbackRouter::new(
            DeviceType::Playback,
            FormatType::F32,
            2,
            handlers,
            Arc::clone(&stats),
        );

        let mut buffer = vec![0u8; 256 * 8];
        assert_eq!(router.send(256, &mut buffer), 7);
        assert_eq!(stats.snapshot().underruns, 1);
    }

    #[test]
    fn test_direction_selects_handler() {
        let handlers = Handlers {
            send: Some(Box::new(|frames: u32, _: &mut [u8]| frames)),
            recv: Some(Box::new(|_: u32, _: &[u8]| panic!("recv on playback"))),
            ..Default::default()
        };
        let mut playback = router(DeviceType::Playback, FormatType::S16, 2, handlers);
        playback.recv(16, &[0u8; 64]);
        assert_eq!(playback.send(16, &mut [0u8; 64]), 16);

        let handlers = Handlers {
            send: Some(Box::new(|_: u32, _: &mut [u8]| -> u32 { panic!("send on capture") })),
            ..Default::default()
        };
        let mut capture = router(DeviceType::Capture, FormatType::S16, 2, handlers);
        assert_eq!(capture.send(16, &mut [0u8; 64]), 0);
    }

    #[test]
    fn test_missing_handler_produces_nothing() {
        let mut router = router(DeviceType::Playback, FormatType::S16, 2, Handlers::default());
        assert_eq!(router.send(16, &mut [0u8; 64]), 0);
    }

    #[test]
    fn test_frames_clamped_to_buffer() {
        let handlers = Handlers {
            send: Some(Box::new(|frames: u32, out: &mut [u8]| {
                assert_eq!(out.len(), frames as usize * 4);
                frames
            })),
            ..Default::default()
        };
        let mut router = router(DeviceType::Playback, FormatType::S16, 2, handlers);
        assert_eq!(router.send(100, &mut [0u8; 40]), 10);
    }

    #[test]
    fn test_stop_fires_once_per_run() {
        let count = Arc::new(AtomicU32::new(0));
        let count_in = Arc::clone(&count);
        let handlers = Handlers {
            stop: Some(Box::new(move || {
                count_in.fetch_add(1, Ordering::SeqCst);
            })),
            ..Default::default()
        };
        let mut router = router(DeviceType::Playback, FormatType::S16, 2, handlers);

        assert!(!router.finish());
        router.arm();
        assert!(router.finish());
        assert!(!router.finish());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_signal_shared_with_clones() {
        let count = Arc::new(AtomicU32::new(0));
        let count_in = Arc::clone(&count);
        let handlers = Handlers {
            stop: Some(Box::new(move || {
                count_in.fetch_add(1, Ordering::SeqCst);
            })),
            ..Default::default()
        };
        let mut router = router(DeviceType::Capture, FormatType::S16, 2, handlers);
        let signal = router.stop_signal();

        router.arm();
        assert!(signal.finish());
        assert!(!router.finish());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let handlers = router.into_handlers();
        assert!(handlers.stop.is_some());
        assert!(signal.take_handler().is_none());
    }

    #[test]
    fn test_prefill_silences_tail() {
        let handlers = Handlers {
            send: Some(Box::new(|_: u32, out: &mut [u8]| {
                out.fill(1);
                2
            })),
            ..Default::default()
        };
        let router = router(DeviceType::Playback, FormatType::U8, 1, handlers);
        let mut io = StreamIo::new(router, TransferBuffer::new(FormatType::U8, 1, 4, 2).unwrap());

        assert_eq!(io.prefill(), 2);
        assert_eq!(io.buffer.as_slice(), &[1, 1, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80]);
    }

    #[test]
    fn test_status_mark_stopped() {
        let status = StreamStatus::new();
        assert!(!status.mark_stopped());

        status.store(DeviceState::Started);
        assert!(status.mark_stopped());
        assert_eq!(status.load(), DeviceState::Initialized);
    }
}
