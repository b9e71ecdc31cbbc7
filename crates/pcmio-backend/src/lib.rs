//! Backend driver interface for pcmio.
//!
//! A backend is one platform audio API (WASAPI, ALSA, ...). The device layer
//! only talks to the traits in this crate, so any driver that implements
//! them can be plugged in through a [`DriverRegistry`].
//!
//! # Architecture
//!
//! ```text
//! DriverRegistry --load--> Box<dyn Backend> --open_stream--> Box<dyn BackendStream>
//!                                                              |
//!                           backend audio thread <-- StreamIo -+
//!                                   |
//!                            CallbackRouter --> send / recv / stop handlers
//! ```

mod buffer;
mod config;
mod error;
mod log;
mod null;
mod registry;
mod router;
mod stats;

pub use buffer::{silence_byte, TransferBuffer};
pub use config::{AlsaContextConfig, ContextConfig, LogProc, PulseContextConfig, ThreadPriority};
pub use error::BackendError;
pub use log::LogSink;
pub use null::{NullBackend, NullLoader};
pub use registry::DriverRegistry;
pub use router::{
    CallbackRouter, Handlers, RecvProc, SendProc, StopProc, StopSignal, StreamIo, StreamStatus,
};
pub use stats::{StatsSnapshot, StreamStats};

use pcmio_types::{BackendKind, DeviceConfig, DeviceId, DeviceInfo, DeviceType};

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// An initialized platform audio API.
///
/// Dropping the backend unloads the driver.
pub trait Backend: Send + Sync {
    /// Which API this is.
    fn kind(&self) -> BackendKind;

    /// List the devices of one direction. An empty list is not an error.
    fn enumerate(&self, device_type: DeviceType) -> BackendResult<Vec<DeviceInfo>>;

    /// Capabilities of a device, or of the default device when `id` is None.
    fn device_info(&self, device_type: DeviceType, id: Option<&DeviceId>)
        -> BackendResult<DeviceInfo>;

    /// Open a stream with an already negotiated config.
    ///
    /// The stream does not deliver callbacks until started.
    fn open_stream(
        &self,
        device_type: DeviceType,
        id: Option<&DeviceId>,
        config: &DeviceConfig,
    ) -> BackendResult<Box<dyn BackendStream>>;
}

/// A stream that failed to start, with its I/O handed back.
pub struct StartFailure {
    /// Why the stream did not start.
    pub error: BackendError,

    /// The I/O bundle passed to `start`.
    pub io: StreamIo,
}

/// One open native stream.
///
/// Dropping the stream releases its native resources.
pub trait BackendStream: Send {
    /// Begin delivering callbacks on the backend's own thread.
    ///
    /// The caller has already set `status` to `Started` and prefilled
    /// playback buffers. If the stream later ends by itself it must call
    /// [`CallbackRouter::finish`] and [`StreamStatus::mark_stopped`] from its
    /// thread.
    fn start(&mut self, io: StreamIo, status: StreamStatus) -> Result<(), StartFailure>;

    /// Halt callback delivery and return the I/O bundle once quiesced.
    ///
    /// Also reclaims the bundle from a stream that already ended by itself.
    fn stop(&mut self) -> BackendResult<StreamIo>;
}

/// Loads one backend on demand.
pub trait BackendLoader: Send + Sync {
    /// Which API this loader provides.
    fn kind(&self) -> BackendKind;

    /// Initialize the backend.
    fn load(&self, config: &ContextConfig, log: &LogSink) -> BackendResult<Box<dyn Backend>>;
}
