//! Context-wide configuration handed to backend loaders.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Diagnostic message callback.
pub type LogProc = Arc<dyn Fn(&str) + Send + Sync>;

/// Scheduling priority requested for backend audio threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThreadPriority {
    Idle,
    Lowest,
    Low,
    Normal,
    High,
    #[default]
    Highest,
    Realtime,
}

/// ALSA context options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlsaContextConfig {
    /// Include every PCM plugin in enumeration, not only hardware devices.
    pub use_verbose_device_enumeration: bool,
}

/// PulseAudio context options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseContextConfig {
    /// Application name reported to the server.
    pub application_name: Option<String>,

    /// Server to connect to (None = default server).
    pub server_name: Option<String>,

    /// Spawn a server if none is running.
    pub try_auto_spawn: bool,
}

/// Options applied when a context loads its backend.
#[derive(Clone, Default)]
pub struct ContextConfig {
    /// Receives backend diagnostic messages. Never called from the data path.
    pub log: Option<LogProc>,

    /// Priority hint for backend audio threads.
    pub thread_priority: ThreadPriority,

    /// ALSA options.
    pub alsa: AlsaContextConfig,

    /// PulseAudio options.
    pub pulse: PulseContextConfig,
}

impl ContextConfig {
    /// Config with a log callback and defaults for everything else.
    pub fn with_log<F>(log: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            log: Some(Arc::new(log)),
            ..Default::default()
        }
    }
}

impl fmt::Debug for ContextConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextConfig")
            .field("log", &self.log.is_some())
            .field("thread_priority", &self.thread_priority)
            .field("alsa", &self.alsa)
            .field("pulse", &self.pulse)
            .finish()
    }
}
