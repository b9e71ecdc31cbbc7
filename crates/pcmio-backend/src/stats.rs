//! Per-stream callback counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free counters updated by the router on the audio thread.
#[derive(Debug, Default)]
pub struct StreamStats {
    callbacks: AtomicU64,
    frames_requested: AtomicU64,
    frames_transferred: AtomicU64,
    underruns: AtomicU64,
}

impl StreamStats {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one handler invocation.
    ///
    /// `transferred` is what the handler reported; for capture it equals
    /// `requested`.
    pub fn record_callback(&self, requested: u32, transferred: u32) {
        self.callbacks.fetch_add(1, Ordering::Relaxed);
        self.frames_requested
            .fetch_add(u64::from(requested), Ordering::Relaxed);
        self.frames_transferred
            .fetch_add(u64::from(transferred.min(requested)), Ordering::Relaxed);

        if transferred < requested {
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Reset all counters.
    pub fn reset(&self) {
        self.callbacks.store(0, Ordering::Relaxed);
        self.frames_requested.store(0, Ordering::Relaxed);
        self.frames_transferred.store(0, Ordering::Relaxed);
        self.underruns.store(0, Ordering::Relaxed);
    }

    /// Read the counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            callbacks: self.callbacks.load(Ordering::Relaxed),
            frames_requested: self.frames_requested.load(Ordering::Relaxed),
            frames_transferred: self.frames_transferred.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`StreamStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Send or recv handler invocations.
    pub callbacks: u64,

    /// Frames the backend asked for or delivered.
    pub frames_requested: u64,

    /// Frames the handlers produced or consumed.
    pub frames_transferred: u64,

    /// Send invocations that returned fewer frames than requested.
    pub underruns: u64,
}
