//! Scripted in-process backend that records what the device layer does.

use std::sync::Arc;

use parking_lot::Mutex;
use pcmio_backend::{
    Backend, BackendError, BackendLoader, BackendResult, BackendStream, ContextConfig,
    DriverRegistry, LogSink, StartFailure, StreamIo, StreamStatus,
};
use pcmio_types::{BackendKind, DeviceConfig, DeviceId, DeviceInfo, DeviceType, FormatType};

use crate::context::Context;

/// Kind the fake registers as.
pub const FAKE_KIND: BackendKind = BackendKind::Alsa;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Load(BackendKind),
    Unload,
    Open(DeviceType),
    Start,
    /// Playback output began consuming the transfer buffer.
    Present,
    Stop,
    Free,
    Disconnect,
    /// Recorded by test handlers.
    Send(u32),
}

/// What the fake reports and which calls fail.
#[derive(Debug, Clone, Default)]
pub struct FakeScript {
    pub playback: Vec<DeviceInfo>,
    pub capture: Vec<DeviceInfo>,
    pub fail_enumeration: bool,
    pub fail_start: bool,
    /// Stop drops the running I/O and reports an error.
    pub fail_stop: bool,
}

impl FakeScript {
    pub fn with_default_devices() -> Self {
        Self {
            playback: vec![fake_device("fake-playback")],
            capture: vec![fake_device("fake-capture")],
            ..Default::default()
        }
    }
}

pub fn fake_device(name: &str) -> DeviceInfo {
    DeviceInfo::new(
        DeviceId::from_backend_bytes(name.as_bytes()),
        name,
        &FormatType::ALL,
        (1, 2),
        (44_100, 48_000),
    )
}

struct Running {
    io: StreamIo,
    status: StreamStatus,
}

struct Shared {
    script: FakeScript,
    events: Mutex<Vec<Event>>,
    running: Mutex<Option<Running>>,
}

/// Test-side handle onto the fake.
#[derive(Clone)]
pub struct FakeHandle {
    shared: Arc<Shared>,
}

impl FakeHandle {
    pub fn new(script: FakeScript) -> Self {
        Self {
            shared: Arc::new(Shared {
                script,
                events: Mutex::new(Vec::new()),
                running: Mutex::new(None),
            }),
        }
    }

    pub fn loader(&self, kind: BackendKind) -> FakeLoader {
        FakeLoader {
            kind,
            fail: false,
            fake: self.clone(),
        }
    }

    pub fn failing_loader(&self, kind: BackendKind) -> FakeLoader {
        FakeLoader {
            kind,
            fail: true,
            fake: self.clone(),
        }
    }

    pub fn registry(&self, kind: BackendKind) -> DriverRegistry {
        let mut registry = DriverRegistry::empty();
        registry.register(self.loader(kind));
        registry
    }

    /// An initialized context on the fake.
    pub fn context(&self) -> Context {
        let mut context = Context::with_registry(self.registry(FAKE_KIND));
        context
            .init(&[FAKE_KIND], ContextConfig::default())
            .expect("fake backend loads");
        context
    }

    pub fn record(&self, event: Event) {
        self.shared.events.lock().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.shared.events.lock().clone()
    }

    pub fn count(&self, event: Event) -> usize {
        self.shared
            .events
            .lock()
            .iter()
            .filter(|e| **e == event)
            .count()
    }

    /// Deliver one period on the calling thread, as a backend thread would.
    ///
    /// Returns the frames produced (playback) or delivered (capture), or
    /// None if no stream is running.
    pub fn run_period(&self) -> Option<u32> {
        let mut running = self.shared.running.lock();
        let Running { io, status } = running.as_mut()?;
        if !status.load().is_started() {
            return None;
        }

        let StreamIo { router, buffer } = io;
        let frames = buffer.period_frames();
        let (result, presented) = match router.device_type() {
            DeviceType::Playback => (router.send(frames, buffer.period_mut(0)), true),
            DeviceType::Capture => {
                router.recv(frames, buffer.period(0));
                (frames, false)
            }
        };
        drop(running);

        if presented {
            self.record(Event::Present);
        }
        Some(result)
    }

    /// End the running stream from the backend side, as on device loss.
    pub fn disconnect(&self) -> bool {
        let mut running = self.shared.running.lock();
        let Some(Running { io, status }) = running.as_mut() else {
            return false;
        };
        if !status.mark_stopped() {
            return false;
        }
        io.router.finish();
        drop(running);

        self.record(Event::Disconnect);
        true
    }
}

pub struct FakeLoader {
    kind: BackendKind,
    fail: bool,
    fake: FakeHandle,
}

impl BackendLoader for FakeLoader {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn load(&self, _config: &ContextConfig, log: &LogSink) -> BackendResult<Box<dyn Backend>> {
        if self.fail {
            return Err(BackendError::Init {
                kind: self.kind,
                message: "scripted failure".to_string(),
            });
        }

        log.log("fake backend loaded");
        self.fake.record(Event::Load(self.kind));
        Ok(Box::new(FakeBackend {
            kind: self.kind,
            fake: self.fake.clone(),
        }))
    }
}

struct FakeBackend {
    kind: BackendKind,
    fake: FakeHandle,
}

impl FakeBackend {
    fn devices(&self, device_type: DeviceType) -> &[DeviceInfo] {
        match device_type {
            DeviceType::Playback => &self.fake.shared.script.playback,
            DeviceType::Capture => &self.fake.shared.script.capture,
        }
    }
}

impl Backend for FakeBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn enumerate(&self, device_type: DeviceType) -> BackendResult<Vec<DeviceInfo>> {
        if self.fake.shared.script.fail_enumeration {
            return Err(BackendError::Enumeration("scripted failure".to_string()));
        }
        Ok(self.devices(device_type).to_vec())
    }

    fn device_info(
        &self,
        device_type: DeviceType,
        id: Option<&DeviceId>,
    ) -> BackendResult<DeviceInfo> {
        let devices = self.devices(device_type);
        let found = match id {
            None => devices.first(),
            Some(id) => devices.iter().find(|info| info.id == *id),
        };
        found.cloned().ok_or(BackendError::DeviceNotFound)
    }

    fn open_stream(
        &self,
        device_type: DeviceType,
        _id: Option<&DeviceId>,
        _config: &DeviceConfig,
    ) -> BackendResult<Box<dyn BackendStream>> {
        self.fake.record(Event::Open(device_type));
        Ok(Box::new(FakeStream {
            device_type,
            fake: self.fake.clone(),
        }))
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.fake.record(Event::Unload);
    }
}

struct FakeStream {
    device_type: DeviceType,
    fake: FakeHandle,
}

impl BackendStream for FakeStream {
    fn start(&mut self, io: StreamIo, status: StreamStatus) -> Result<(), StartFailure> {
        self.fake.record(Event::Start);
        if self.fake.shared.script.fail_start {
            return Err(StartFailure {
                error: BackendError::Native {
                    code: -1,
                    message: "scripted failure".to_string(),
                },
                io,
            });
        }

        *self.fake.shared.running.lock() = Some(Running { io, status });
        if self.device_type.is_playback() {
            self.fake.record(Event::Present);
        }
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<StreamIo> {
        let running = self
            .fake
            .shared
            .running
            .lock()
            .take()
            .ok_or_else(|| BackendError::Stream("fake stream not running".to_string()))?;

        self.fake.record(Event::Stop);
        if self.fake.shared.script.fail_stop {
            drop(running);
            return Err(BackendError::Stream("scripted failure".to_string()));
        }
        Ok(running.io)
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.fake.record(Event::Free);
    }
}
