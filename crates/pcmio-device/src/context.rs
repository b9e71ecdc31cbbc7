//! Backend selection and device enumeration.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pcmio_backend::{Backend, ContextConfig, DriverRegistry, LogSink};
use pcmio_types::{BackendKind, ContextState, DeviceConfig, DeviceId, DeviceInfo, DeviceType};
use tracing::{debug, info, instrument, warn};

use crate::callbacks::DeviceCallbacks;
use crate::device::Device;
use crate::error::DeviceError;
use crate::DeviceResult;

/// Process-level handle owning exactly one active backend.
///
/// Devices borrow the context only while initializing; afterwards they hold
/// their own stream. The context refuses to uninitialize while any device
/// created from it is still initialized.
pub struct Context {
    registry: DriverRegistry,
    backend: Option<Box<dyn Backend>>,
    log: LogSink,
    live_devices: Arc<AtomicUsize>,
}

impl Context {
    /// An uninitialized context over every backend built into this crate.
    pub fn new() -> Self {
        Self::with_registry(DriverRegistry::platform())
    }

    /// An uninitialized context choosing from `registry`.
    pub fn with_registry(registry: DriverRegistry) -> Self {
        Self {
            registry,
            backend: None,
            log: LogSink::default(),
            live_devices: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Loaders available to [`init`](Self::init).
    pub fn registry_mut(&mut self) -> &mut DriverRegistry {
        &mut self.registry
    }

    /// Try each backend in `backends` until one loads.
    ///
    /// An empty list means [`BackendKind::DEFAULT_ORDER`].
    #[instrument(name = "context_init", skip(self, config))]
    pub fn init(&mut self, backends: &[BackendKind], config: ContextConfig) -> DeviceResult<()> {
        if self.backend.is_some() {
            return Err(DeviceError::DeviceBusy(
                "context already initialized".to_string(),
            ));
        }

        let log = LogSink::new(config.log.clone());
        let order = if backends.is_empty() {
            &BackendKind::DEFAULT_ORDER[..]
        } else {
            backends
        };

        for &kind in order {
            match self.registry.load(kind, &config, &log) {
                Ok(backend) => {
                    info!(backend = %kind, "Audio backend selected");
                    log.log(&format!("Using backend {}", kind));
                    self.backend = Some(backend);
                    self.log = log;
                    return Ok(());
                }
                Err(e) => {
                    warn!(backend = %kind, "Backend unavailable: {}", e);
                    log.log(&format!("Failed to initialize {}: {}", kind, e));
                }
            }
        }

        Err(DeviceError::NoBackendAvailable)
    }

    /// Unload the backend.
    ///
    /// Every device created from this context must be uninitialized first.
    #[instrument(name = "context_uninit", skip(self))]
    pub fn uninit(&mut self) -> DeviceResult<()> {
        if self.backend.is_none() {
            return Err(DeviceError::NotInitialized);
        }

        let live = self.live_devices.load(Ordering::SeqCst);
        if live > 0 {
            return Err(DeviceError::DeviceBusy(format!(
                "{} device(s) still initialized",
                live
            )));
        }

        if let Some(backend) = self.backend.take() {
            info!(backend = %backend.kind(), "Audio backend unloaded");
        }
        Ok(())
    }

    /// Current state.
    pub fn state(&self) -> ContextState {
        if self.backend.is_some() {
            ContextState::Initialized
        } else {
            ContextState::Uninitialized
        }
    }

    /// Returns true once a backend is loaded.
    pub fn is_initialized(&self) -> bool {
        self.state().is_initialized()
    }

    /// The selected backend.
    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(|backend| backend.kind())
    }

    /// Devices created from this context that are still initialized.
    pub fn live_devices(&self) -> usize {
        self.live_devices.load(Ordering::SeqCst)
    }

    /// Query the devices of one direction.
    ///
    /// Each call queries the backend afresh. Ordering is backend-defined.
    #[instrument(name = "enumerate_devices", skip(self))]
    pub fn enumerate_devices(&self, device_type: DeviceType) -> DeviceResult<DeviceIter> {
        let backend = self.backend()?;
        let devices = backend
            .enumerate(device_type)
            .map_err(|e| DeviceError::EnumerationFailed(e.to_string()))?;

        debug!(count = devices.len(), "Enumerated devices");
        Ok(DeviceIter {
            inner: devices.into_iter(),
        })
    }

    /// Create and initialize a device with its callbacks in one step.
    pub fn init_device(
        &self,
        device_type: DeviceType,
        id: Option<&DeviceId>,
        config: DeviceConfig,
        callbacks: DeviceCallbacks,
    ) -> DeviceResult<Device> {
        let mut device = Device::new();
        device.set_callbacks(callbacks)?;
        device.init(self, device_type, id, config)?;
        Ok(device)
    }

    pub(crate) fn backend(&self) -> DeviceResult<&dyn Backend> {
        self.backend.as_deref().ok_or(DeviceError::NotInitialized)
    }

    pub(crate) fn log(&self) -> &LogSink {
        &self.log
    }

    pub(crate) fn lease(&self) -> DeviceLease {
        self.live_devices.fetch_add(1, Ordering::SeqCst);
        DeviceLease(Arc::clone(&self.live_devices))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        let live = self.live_devices.load(Ordering::SeqCst);
        if self.backend.is_some() && live > 0 {
            warn!(live, "Context dropped with initialized devices");
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("backend", &self.backend_kind())
            .field("live_devices", &self.live_devices())
            .finish()
    }
}

/// Counts one initialized device against its context.
#[derive(Debug)]
pub(crate) struct DeviceLease(Arc<AtomicUsize>);

impl Drop for DeviceLease {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One-shot sequence of devices from [`Context::enumerate_devices`].
#[derive(Debug)]
pub struct DeviceIter {
    inner: std::vec::IntoIter<DeviceInfo>,
}

impl Iterator for DeviceIter {
    type Item = DeviceInfo;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for DeviceIter {}
