//! Backend driver registry.

use pcmio_types::BackendKind;
use tracing::debug;

use crate::config::ContextConfig;
use crate::error::BackendError;
use crate::log::LogSink;
use crate::null::NullLoader;
use crate::{Backend, BackendLoader, BackendResult};

/// The set of backend loaders a context can choose from.
#[derive(Default)]
pub struct DriverRegistry {
    loaders: Vec<Box<dyn BackendLoader>>,
}

impl DriverRegistry {
    /// A registry with no loaders.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every backend compiled into this build.
    ///
    /// Native drivers are registered by the application with
    /// [`register`](Self::register); the Null backend is always present.
    pub fn platform() -> Self {
        let mut registry = Self::empty();
        registry.register(NullLoader);
        registry
    }

    /// Add a loader, replacing any loader of the same kind.
    pub fn register<L>(&mut self, loader: L) -> &mut Self
    where
        L: BackendLoader + 'static,
    {
        let kind = loader.kind();
        self.loaders.retain(|existing| existing.kind() != kind);
        self.loaders.push(Box::new(loader));
        debug!(%kind, "Registered backend loader");
        self
    }

    /// Kinds with a registered loader.
    pub fn kinds(&self) -> Vec<BackendKind> {
        self.loaders.iter().map(|loader| loader.kind()).collect()
    }

    /// Returns true if `kind` has a loader.
    pub fn contains(&self, kind: BackendKind) -> bool {
        self.loaders.iter().any(|loader| loader.kind() == kind)
    }

    /// Load one backend.
    pub fn load(
        &self,
        kind: BackendKind,
        config: &ContextConfig,
        log: &LogSink,
    ) -> BackendResult<Box<dyn Backend>> {
        let loader = self
            .loaders
            .iter()
            .find(|loader| loader.kind() == kind)
            .ok_or(BackendError::Unavailable(kind))?;

        loader.load(config, log)
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
