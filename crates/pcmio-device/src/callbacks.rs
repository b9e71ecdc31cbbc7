//! Handler bundle accepted when creating a device.

use pcmio_backend::{Handlers, RecvProc, SendProc, StopProc};

use crate::stream::{SampleSink, SampleSource};

/// Send, recv and stop handlers for one device.
///
/// Handlers run on the backend's audio thread and must return promptly.
#[derive(Default)]
pub struct DeviceCallbacks {
    pub(crate) send: Option<SendProc>,
    pub(crate) recv: Option<RecvProc>,
    pub(crate) stop: Option<StopProc>,
}

impl DeviceCallbacks {
    /// No handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Playback handler: fill the slice, return frames written.
    pub fn on_send<F>(mut self, handler: F) -> Self
    where
        F: FnMut(u32, &mut [u8]) -> u32 + Send + 'static,
    {
        self.send = Some(Box::new(handler));
        self
    }

    /// Capture handler.
    pub fn on_recv<F>(mut self, handler: F) -> Self
    where
        F: FnMut(u32, &[u8]) + Send + 'static,
    {
        self.recv = Some(Box::new(handler));
        self
    }

    /// Stop notification, fired once each time a started stream stops.
    pub fn on_stop<F>(mut self, handler: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.stop = Some(Box::new(handler));
        self
    }

    /// Feed playback from a [`SampleSource`].
    pub fn from_source<S>(mut source: S) -> Self
    where
        S: SampleSource + 'static,
    {
        Self::new().on_send(move |frames, out| source.read_frames(frames, out))
    }

    /// Deliver capture into a [`SampleSink`].
    pub fn from_sink<S>(mut sink: S) -> Self
    where
        S: SampleSink + 'static,
    {
        Self::new().on_recv(move |frames, input| sink.write_frames(frames, input))
    }
}

impl From<DeviceCallbacks> for Handlers {
    fn from(callbacks: DeviceCallbacks) -> Self {
        Handlers {
            send: callbacks.send,
            recv: callbacks.recv,
            stop: callbacks.stop,
        }
    }
}

impl std::fmt::Debug for DeviceCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceCallbacks")
            .field("send", &self.send.is_some())
            .field("recv", &self.recv.is_some())
            .field("stop", &self.stop.is_some())
            .finish()
    }
}
