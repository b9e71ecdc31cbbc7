//! Device lifecycle.
//!
//! ```text
//! Uninitialized --init--> Initialized --start--> Started
//!       ^                    |    ^                 |
//!       +------uninit--------+    +------stop-------+
//! ```
//!
//! While started, the handlers and transfer buffer live in a [`StreamIo`]
//! owned by the backend thread. Stop hands them back. A device that has
//! been uninitialized stays retired; open a new one instead.

use std::sync::Arc;

use pcmio_backend::{
    BackendStream, CallbackRouter, Handlers, StartFailure, StatsSnapshot, StopSignal, StreamIo,
    StreamStats, StreamStatus, TransferBuffer,
};
use pcmio_types::{BackendKind, DeviceConfig, DeviceId, DeviceState, DeviceType, FormatType};
use tracing::{debug, info, instrument, warn};

use crate::callbacks::DeviceCallbacks;
use crate::context::{Context, DeviceLease};
use crate::error::DeviceError;
use crate::negotiate::negotiate;
use crate::DeviceResult;

/// A playback or capture device.
pub struct Device {
    status: StreamStatus,
    handlers: Handlers,
    stats: Arc<StreamStats>,
    bound: Option<Bound>,
    retired: bool,
}

/// Everything that exists only between init and uninit.
struct Bound {
    device_type: DeviceType,
    config: DeviceConfig,
    name: String,
    backend_kind: BackendKind,
    stream: Box<dyn BackendStream>,
    // None while the backend thread owns the I/O.
    buffer: Option<TransferBuffer>,
    // Set while a run is in flight.
    stop_signal: Option<StopSignal>,
    _lease: DeviceLease,
}

fn transfer_buffer(config: &DeviceConfig) -> DeviceResult<TransferBuffer> {
    Ok(TransferBuffer::new(
        config.format,
        config.channels,
        config.buffer_size_in_frames,
        config.periods,
    )?)
}

impl Bound {
    fn fresh_buffer(&self) -> DeviceResult<TransferBuffer> {
        transfer_buffer(&self.config)
    }

    /// Put a returned I/O bundle back, firing the stop handler if the
    /// backend has not already done so.
    fn restore(&mut self, handlers: &mut Handlers, io: StreamIo) {
        let StreamIo {
            mut router,
            mut buffer,
        } = io;

        router.finish();
        buffer.clear();
        *handlers = router.into_handlers();
        self.buffer = Some(buffer);
        self.stop_signal = None;
    }

    /// Settle a run whose I/O the backend failed to hand back.
    ///
    /// The stop handler still fires once and is kept. The send and recv
    /// handlers went down with the backend thread.
    fn recover(&mut self, handlers: &mut Handlers) {
        if let Some(signal) = self.stop_signal.take() {
            signal.finish();
            *handlers = Handlers {
                stop: signal.take_handler(),
                ..Handlers::default()
            };
        }
        self.buffer = self.fresh_buffer().ok();
        warn!(device = %self.name, "Send and recv handlers lost with the backend stream");
    }
}

impl Device {
    /// An uninitialized device with no handlers.
    pub fn new() -> Self {
        Self {
            status: StreamStatus::new(),
            handlers: Handlers::default(),
            stats: Arc::new(StreamStats::new()),
            bound: None,
            retired: false,
        }
    }

    /// Bind to a device of `context`'s backend.
    ///
    /// `id = None` selects the backend's default device. The config is
    /// negotiated against the device's capabilities and frozen until
    /// [`uninit`](Self::uninit). A device cannot be initialized again after
    /// `uninit`.
    #[instrument(name = "device_init", skip(self, context, config))]
    pub fn init(
        &mut self,
        context: &Context,
        device_type: DeviceType,
        id: Option<&DeviceId>,
        config: DeviceConfig,
    ) -> DeviceResult<()> {
        if self.bound.is_some() {
            return Err(DeviceError::DeviceBusy(
                "device already initialized".to_string(),
            ));
        }
        if self.retired {
            return Err(DeviceError::DeviceBusy(
                "device was uninitialized; create a new one".to_string(),
            ));
        }

        let backend = context.backend()?;
        let info = backend.device_info(device_type, id)?;
        let config = negotiate(device_type, &info, &config)?;
        let buffer = transfer_buffer(&config)?;
        let stream = backend.open_stream(device_type, id, &config)?;

        context
            .log()
            .log(&format!("Opened {} device {}", device_type, info.name));
        info!(
            device = %info.name,
            format = %config.format,
            channels = config.channels,
            sample_rate = config.sample_rate,
            "Device initialized"
        );

        let bound = Bound {
            device_type,
            config,
            name: info.name,
            backend_kind: backend.kind(),
            stream,
            buffer: Some(buffer),
            stop_signal: None,
            _lease: context.lease(),
        };

        self.stats.reset();
        self.status.store(DeviceState::Initialized);
        self.bound = Some(bound);
        Ok(())
    }

    /// Begin streaming.
    ///
    /// Playback devices pull one full transfer buffer from the send handler
    /// before the backend starts, so output begins with real samples.
    #[instrument(name = "device_start", skip(self))]
    pub fn start(&mut self) -> DeviceResult<()> {
        self.collect_ended_stream();

        let bound = self.bound.as_mut().ok_or(DeviceError::NotInitialized)?;
        if self.status.load().is_started() {
            return Err(DeviceError::DeviceBusy("device already started".to_string()));
        }

        let buffer = match bound.buffer.take() {
            Some(buffer) => buffer,
            None => bound.fresh_buffer()?,
        };
        let mut router = CallbackRouter::new(
            bound.device_type,
            bound.config.format,
            bound.config.channels,
            std::mem::take(&mut self.handlers),
            Arc::clone(&self.stats),
        );
        router.arm();
        let stop_signal = router.stop_signal();

        let mut io = StreamIo::new(router, buffer);
        if bound.device_type.is_playback() {
            let produced = io.prefill();
            debug!(produced, frames = io.buffer.frames(), "Prefilled playback buffer");
        }

        self.status.store(DeviceState::Started);
        match bound.stream.start(io, self.status.clone()) {
            Ok(()) => {
                bound.stop_signal = Some(stop_signal);
                info!(device = %bound.name, "Device started");
                Ok(())
            }
            Err(StartFailure { error, io }) => {
                self.status.store(DeviceState::Initialized);

                // Never started, so no stop notification.
                let StreamIo { router, mut buffer } = io;
                buffer.clear();
                self.handlers = router.into_handlers();
                bound.buffer = Some(buffer);

                warn!(device = %bound.name, "Device failed to start: {}", error);
                Err(error.into())
            }
        }
    }

    /// Stop streaming and discard buffered samples.
    ///
    /// Fires the stop handler, even when the backend fails to stop cleanly.
    /// In that case the error is returned and the send and recv handlers
    /// must be registered again. Stopping a device that is not started fails
    /// with [`DeviceError::DeviceBusy`], unless the backend ended the stream
    /// by itself, in which case this only reclaims it.
    #[instrument(name = "device_stop", skip(self))]
    pub fn stop(&mut self) -> DeviceResult<()> {
        let detached = match &self.bound {
            None => return Err(DeviceError::NotInitialized),
            Some(bound) => bound.buffer.is_none(),
        };

        if !self.status.load().is_started() {
            if detached {
                self.collect_ended_stream();
                return Ok(());
            }
            return Err(DeviceError::DeviceBusy("device not started".to_string()));
        }

        let bound = self.bound.as_mut().ok_or(DeviceError::NotInitialized)?;
        match bound.stream.stop() {
            Ok(io) => {
                self.status.store(DeviceState::Initialized);
                bound.restore(&mut self.handlers, io);
                info!(device = %bound.name, "Device stopped");
                Ok(())
            }
            Err(e) => {
                self.status.store(DeviceState::Initialized);
                warn!(device = %bound.name, "Device stop failed: {}", e);
                bound.recover(&mut self.handlers);
                Err(e.into())
            }
        }
    }

    /// Release the backend stream, stopping first if needed.
    ///
    /// Safe in any state and idempotent. The device is retired afterwards:
    /// [`init`](Self::init) fails with [`DeviceError::DeviceBusy`].
    #[instrument(name = "device_uninit", skip(self))]
    pub fn uninit(&mut self) {
        let Some(mut bound) = self.bound.take() else {
            return;
        };
        self.retired = true;

        if self.status.load().is_started() || bound.buffer.is_none() {
            match bound.stream.stop() {
                Ok(io) => {
                    self.status.store(DeviceState::Initialized);
                    bound.restore(&mut self.handlers, io);
                }
                Err(e) => {
                    warn!(device = %bound.name, "Stop during uninit failed: {}", e);
                    bound.recover(&mut self.handlers);
                }
            }
        }

        let name = std::mem::take(&mut bound.name);
        drop(bound);
        self.status.store(DeviceState::Uninitialized);
        info!(device = %name, "Device uninitialized");
    }

    /// Take the I/O back from a stream the backend ended by itself.
    fn collect_ended_stream(&mut self) {
        let Some(bound) = self.bound.as_mut() else {
            return;
        };
        if bound.buffer.is_some() || self.status.load().is_started() {
            return;
        }

        match bound.stream.stop() {
            Ok(io) => {
                bound.restore(&mut self.handlers, io);
                debug!(device = %bound.name, "Reclaimed stream ended by backend");
            }
            Err(e) => {
                warn!(device = %bound.name, "Failed to reclaim ended stream: {}", e);
                bound.recover(&mut self.handlers);
            }
        }
    }

    fn handlers_mut(&mut self) -> DeviceResult<&mut Handlers> {
        self.collect_ended_stream();
        if self.status.load().is_started() {
            return Err(DeviceError::DeviceBusy(
                "cannot change callbacks while started".to_string(),
            ));
        }
        Ok(&mut self.handlers)
    }

    /// Register the playback handler.
    pub fn set_send_callback<F>(&mut self, handler: F) -> DeviceResult<()>
    where
        F: FnMut(u32, &mut [u8]) -> u32 + Send + 'static,
    {
        self.handlers_mut()?.send = Some(Box::new(handler));
        Ok(())
    }

    /// Register the capture handler.
    pub fn set_recv_callback<F>(&mut self, handler: F) -> DeviceResult<()>
    where
        F: FnMut(u32, &[u8]) + Send + 'static,
    {
        self.handlers_mut()?.recv = Some(Box::new(handler));
        Ok(())
    }

    /// Register the stop notification.
    pub fn set_stop_callback<F>(&mut self, handler: F) -> DeviceResult<()>
    where
        F: FnMut() + Send + 'static,
    {
        self.handlers_mut()?.stop = Some(Box::new(handler));
        Ok(())
    }

    /// Replace all three handler slots.
    pub fn set_callbacks(&mut self, callbacks: DeviceCallbacks) -> DeviceResult<()> {
        *self.handlers_mut()? = callbacks.into();
        Ok(())
    }

    /// Current lifecycle state. Lock-free.
    pub fn state(&self) -> DeviceState {
        self.status.load()
    }

    /// Returns true while streaming. Lock-free.
    pub fn is_started(&self) -> bool {
        self.status.load().is_started()
    }

    /// Playback or capture.
    pub fn device_type(&self) -> Option<DeviceType> {
        self.bound.as_ref().map(|bound| bound.device_type)
    }

    /// The negotiated config.
    pub fn config(&self) -> Option<&DeviceConfig> {
        self.bound.as_ref().map(|bound| &bound.config)
    }

    /// Negotiated sample format.
    pub fn format(&self) -> Option<FormatType> {
        self.config().map(|config| config.format)
    }

    /// Negotiated channel count.
    pub fn channels(&self) -> Option<u32> {
        self.config().map(|config| config.channels)
    }

    /// Negotiated sample rate.
    pub fn sample_rate(&self) -> Option<u32> {
        self.config().map(|config| config.sample_rate)
    }

    /// Size in bytes of one frame.
    pub fn bytes_per_frame(&self) -> Option<u32> {
        self.config().map(DeviceConfig::bytes_per_frame)
    }

    /// Size in bytes of the transfer buffer.
    pub fn buffer_size_in_bytes(&self) -> Option<usize> {
        self.config().map(DeviceConfig::transfer_size_in_bytes)
    }

    /// Name reported by the backend.
    pub fn name(&self) -> Option<&str> {
        self.bound.as_ref().map(|bound| bound.name.as_str())
    }

    /// Backend that opened this device.
    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.bound.as_ref().map(|bound| bound.backend_kind)
    }

    /// Callback counters since init.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.uninit();
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("state", &self.state())
            .field("name", &self.name())
            .field("config", &self.config())
            .field("handlers", &self.handlers)
            .finish()
    }
}
