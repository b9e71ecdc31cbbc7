//! Null backend: no hardware, real timing.
//!
//! Streams run a worker thread that paces periods at the configured sample
//! rate. Playback output is discarded and capture delivers silence.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, SendError, Sender};
use pcmio_types::{
    BackendKind, DeviceConfig, DeviceId, DeviceInfo, DeviceType, FormatType, MAX_CHANNELS,
    MAX_SAMPLE_RATE, MIN_SAMPLE_RATE,
};
use tracing::{debug, info, instrument};

use crate::config::ContextConfig;
use crate::error::BackendError;
use crate::log::LogSink;
use crate::router::{StreamIo, StreamStatus};
use crate::{Backend, BackendLoader, BackendResult, BackendStream, StartFailure};

const PLAYBACK_ID: &[u8] = b"null-playback";
const CAPTURE_ID: &[u8] = b"null-capture";

/// Loader for [`NullBackend`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLoader;

impl BackendLoader for NullLoader {
    fn kind(&self) -> BackendKind {
        BackendKind::Null
    }

    fn load(&self, config: &ContextConfig, log: &LogSink) -> BackendResult<Box<dyn Backend>> {
        log.log("Null backend loaded");
        Ok(Box::new(NullBackend::new(config, log.clone())))
    }
}

/// Backend with one playback and one capture device and no hardware.
#[derive(Debug)]
pub struct NullBackend {
    log: LogSink,
}

impl NullBackend {
    /// Create the backend.
    pub fn new(config: &ContextConfig, log: LogSink) -> Self {
        debug!(priority = ?config.thread_priority, "Null backend created");
        Self { log }
    }

    fn info_for(device_type: DeviceType) -> DeviceInfo {
        let (id, name) = match device_type {
            DeviceType::Playback => (PLAYBACK_ID, "NULL Playback Device"),
            DeviceType::Capture => (CAPTURE_ID, "NULL Capture Device"),
        };

        DeviceInfo::new(
            DeviceId::from_backend_bytes(id),
            name,
            &FormatType::ALL,
            (1, MAX_CHANNELS),
            (MIN_SAMPLE_RATE, MAX_SAMPLE_RATE),
        )
    }
}

impl Backend for NullBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Null
    }

    fn enumerate(&self, device_type: DeviceType) -> BackendResult<Vec<DeviceInfo>> {
        Ok(vec![Self::info_for(device_type)])
    }

    fn device_info(
        &self,
        device_type: DeviceType,
        id: Option<&DeviceId>,
    ) -> BackendResult<DeviceInfo> {
        let info = Self::info_for(device_type);
        match id {
            Some(id) if *id != info.id => Err(BackendError::DeviceNotFound),
            _ => Ok(info),
        }
    }

    #[instrument(name = "null_open_stream", skip(self, config))]
    fn open_stream(
        &self,
        device_type: DeviceType,
        id: Option<&DeviceId>,
        config: &DeviceConfig,
    ) -> BackendResult<Box<dyn BackendStream>> {
        let info = self.device_info(device_type, id)?;
        self.log.log(&format!("Opened {}", info.name));

        Ok(Box::new(NullStream::new(device_type, config)))
    }
}

/// A stream of the Null backend.
pub struct NullStream {
    device_type: DeviceType,
    period: Duration,
    worker: Option<Worker>,
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<Option<StreamIo>>,
}

impl NullStream {
    fn new(device_type: DeviceType, config: &DeviceConfig) -> Self {
        let rate = config.sample_rate.max(1);
        let period = Duration::from_secs_f64(
            f64::from(config.buffer_size_in_frames.max(1)) / f64::from(rate),
        );

        Self {
            device_type,
            period,
            worker: None,
        }
    }
}

impl BackendStream for NullStream {
    fn start(&mut self, io: StreamIo, _status: StreamStatus) -> Result<(), StartFailure> {
        if self.worker.is_some() {
            return Err(StartFailure {
                error: BackendError::Stream("Null stream already running".to_string()),
                io,
            });
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let (io_tx, io_rx) = crossbeam_channel::bounded::<StreamIo>(1);
        let device_type = self.device_type;
        let period = self.period;

        // The worker waits for the I/O bundle so a failed spawn can hand it back.
        let spawned = thread::Builder::new()
            .name(format!("pcmio-null-{}", device_type))
            .spawn(move || {
                let io = io_rx.recv().ok()?;
                Some(run_periods(io, device_type, period, stop_rx))
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                return Err(StartFailure {
                    error: BackendError::Stream(format!("Failed to spawn worker: {}", e)),
                    io,
                })
            }
        };

        if let Err(SendError(io)) = io_tx.send(io) {
            let _ = handle.join();
            return Err(StartFailure {
                error: BackendError::Stream("Null worker exited early".to_string()),
                io,
            });
        }

        info!(%device_type, ?period, "Null stream started");
        self.worker = Some(Worker { stop_tx, handle });
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<StreamIo> {
        let worker = self
            .worker
            .take()
            .ok_or_else(|| BackendError::Stream("Null stream not running".to_string()))?;

        let _ = worker.stop_tx.send(());
        let io = worker
            .handle
            .join()
            .ok()
            .flatten()
            .ok_or_else(|| BackendError::Stream("Null worker panicked".to_string()))?;

        info!(device_type = %self.device_type, "Null stream stopped");
        Ok(io)
    }
}

impl Drop for NullStream {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.handle.join();
        }
    }
}

fn run_periods(
    mut io: StreamIo,
    device_type: DeviceType,
    period: Duration,
    stop_rx: Receiver<()>,
) -> StreamIo {
    debug!("Null worker started");

    let period_frames = io.buffer.period_frames();
    let mut index = 0u32;
    let mut next_period = Instant::now() + period;

    loop {
        let wait = next_period.saturating_duration_since(Instant::now());
        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let StreamIo { router, buffer } = &mut io;
        match device_type {
            DeviceType::Playback => {
                // The period just "played"; refill it.
                router.send(period_frames, buffer.period_mut(index));
            }
            DeviceType::Capture => {
                buffer.clear_period(index);
                router.recv(period_frames, buffer.period(index));
            }
        }

        index = (index + 1) % buffer.periods().max(1);
        next_period += period;
    }

    debug!("Null worker exiting");
    io
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::TransferBuffer;
    use crate::router::{CallbackRouter, Handlers};
    use crate::stats::StreamStats;
    use pcmio_types::DeviceState;
    use std::sync::Arc;

    fn backend() -> NullBackend {
        NullBackend::new(&ContextConfig::default(), LogSink::default())
    }

    fn io_for(device_type: DeviceType, config: &DeviceConfig, handlers: Handlers, stats: Arc<StreamStats>) -> StreamIo {
        let router = CallbackRouter::new(device_type, config.format, config.channels, handlers, stats);
        let buffer = TransferBuffer::new(
            config.format,
            config.channels,
            config.buffer_size_in_frames,
            config.periods,
        )
        .unwrap();
        StreamIo::new(router, buffer)
    }

    fn config() -> DeviceConfig {
        DeviceConfig {
            buffer_size_in_frames: 48,
            periods: 2,
            ..DeviceConfig::new(FormatType::S16, 2, 48_000)
        }
    }

    #[test]
    fn test_enumerate_one_device_per_direction() {
        let backend = backend();
        let playback = backend.enumerate(DeviceType::Playback).unwrap();
        let capture = backend.enumerate(DeviceType::Capture).unwrap();

        assert_eq!(playback.len(), 1);
        assert_eq!(capture.len(), 1);
        assert_ne!(playback[0].id, capture[0].id);
        assert!(playback[0].supports_format(FormatType::S24));
    }

    #[test]
    fn test_unknown_id_not_found() {
        let backend = backend();
        let capture_id = backend.enumerate(DeviceType::Capture).unwrap()[0].id;
        let result = backend.device_info(DeviceType::Playback, Some(&capture_id));
        assert!(matches!(result, Err(BackendError::DeviceNotFound)));
    }

    #[test]
    fn test_playback_stream_pulls_periods() {
        let backend = backend();
        let config = config();
        let mut stream = backend
            .open_stream(DeviceType::Playback, None, &config)
            .unwrap();

        let stats = Arc::new(StreamStats::new());
        let handlers = Handlers {
            send: Some(Box::new(|frames: u32, out: &mut [u8]| {
                assert_eq!(out.len(), frames as usize * 4);
                frames
            })),
            ..Default::default()
        };
        let status = StreamStatus::new();
        status.store(DeviceState::Started);

        let io = io_for(DeviceType::Playback, &config, handlers, Arc::clone(&stats));
        assert!(stream.start(io, status).is_ok());
        thread::sleep(Duration::from_millis(20));
        let io = stream.stop().unwrap();

        assert!(stats.snapshot().callbacks > 0);
        assert_eq!(stats.snapshot().underruns, 0);
        assert_eq!(io.buffer.len(), 48 * 2 * 4);
    }

    #[test]
    fn test_capture_stream_delivers_silence() {
        let backend = backend();
        let config = config();
        let mut stream = backend
            .open_stream(DeviceType::Capture, None, &config)
            .unwrap();

        let (tx, rx) = crossbeam_channel::unbounded();
        let handlers = Handlers {
            recv: Some(Box::new(move |_: u32, input: &[u8]| {
                let _ = tx.send(input.iter().all(|&b| b == 0));
            })),
            ..Default::default()
        };

        let io = io_for(DeviceType::Capture, &config, handlers, Arc::new(StreamStats::new()));
        assert!(stream.start(io, StreamStatus::new()).is_ok());
        let silent = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        stream.stop().unwrap();

        assert!(silent);
    }

    #[test]
    fn test_stop_without_start_fails() {
        let backend = backend();
        let mut stream = backend
            .open_stream(DeviceType::Playback, None, &config())
            .unwrap();
        assert!(matches!(stream.stop(), Err(BackendError::Stream(_))));
    }
}
