//! SinkRegistry - sink type name to factory lookup

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use contracts::{Sink, SinkFactory, CONSOLE_SINK, FILE_SINK};
use tracing::warn;

use crate::sinks::{ConsoleSink, FileSink};

/// Maps sink type names to factories.
///
/// First registration wins; registering a name twice is a warning, not an
/// error, and keeps the existing factory.
#[derive(Default)]
pub struct SinkRegistry {
    factories: RwLock<HashMap<String, SinkFactory>>,
}

impl SinkRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `console` and `file` already registered
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register(CONSOLE_SINK, || Box::new(ConsoleSink::new()) as Box<dyn Sink>);
        registry.register(FILE_SINK, || Box::new(FileSink::new()) as Box<dyn Sink>);
        registry
    }

    /// Process-wide registry used by dispatchers that were not given one
    pub fn global() -> Arc<SinkRegistry> {
        static GLOBAL: OnceLock<Arc<SinkRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::with_builtin())))
    }

    /// Register a factory under `sink_type`.
    ///
    /// Returns `false` (and logs a warning) if the name is already taken.
    pub fn register<F>(&self, sink_type: &str, factory: F) -> bool
    where
        F: Fn() -> Box<dyn Sink> + Send + Sync + 'static,
    {
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if factories.contains_key(sink_type) {
            warn!(sink_type, "Sink type registered twice, keeping the first factory");
            return false;
        }
        factories.insert(sink_type.to_string(), Arc::new(factory));
        true
    }

    pub fn lookup(&self, sink_type: &str) -> Option<SinkFactory> {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sink_type)
            .cloned()
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
