//! Backend diagnostic log sink.

use tracing::debug;

use crate::config::LogProc;

/// Forwards backend diagnostics to the application's log callback.
///
/// Every message is mirrored to `tracing` at debug level.
#[derive(Clone, Default)]
pub struct LogSink {
    proc_: Option<LogProc>,
}

impl LogSink {
    /// Create a sink around an optional callback.
    pub fn new(proc_: Option<LogProc>) -> Self {
        Self { proc_ }
    }

    /// Emit one diagnostic message.
    pub fn log(&self, message: &str) {
        debug!(target: "pcmio::backend", "{}", message);

        if let Some(ref proc_) = self.proc_ {
            proc_(message);
        }
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSink")
            .field("attached", &self.proc_.is_some())
            .finish()
    }
}
