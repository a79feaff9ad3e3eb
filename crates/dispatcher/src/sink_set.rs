//! SinkSet - ordered list of attached sinks
//!
//! Writers take a cheap snapshot (`Arc` clone) and write outside any
//! dispatcher lock; configuration swaps in a new list.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use contracts::{LogRecord, Sink};
use tracing::{debug, error};

use crate::error::DispatcherError;
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::registry::SinkRegistry;

/// A sink attached under its type name
pub(crate) struct AttachedSink {
    name: String,
    sink: Box<dyn Sink>,
    metrics: SinkMetrics,
}

impl AttachedSink {
    fn write(&self, record: &LogRecord) {
        match self.sink.write_msg(record) {
            Ok(()) => self.metrics.inc_write_count(),
            Err(e) => {
                self.metrics.inc_failure_count();
                // Continue with the remaining sinks - one failure never aborts fan-out
                error!(sink = %self.name, error = %e, "Unable to write record");
            }
        }
    }

    fn flush(&self) {
        if let Err(e) = self.sink.flush() {
            error!(sink = %self.name, error = %e, "Flush failed");
        }
    }
}

type SinkList = Arc<Vec<Arc<AttachedSink>>>;

#[derive(Default)]
pub(crate) struct SinkSet {
    /// Serializes attach/remove so setup calls cannot race
    config_lock: Mutex<()>,
    current: RwLock<SinkList>,
}

impl SinkSet {
    fn lock_config(&self) -> MutexGuard<'_, ()> {
        self.config_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> SinkList {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn replace(&self, list: Vec<Arc<AttachedSink>>) -> SinkList {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, Arc::new(list))
    }

    /// Build, initialize and append a sink of `sink_type`
    pub(crate) fn attach(
        &self,
        registry: &SinkRegistry,
        sink_type: &str,
        config: &str,
    ) -> Result<(), DispatcherError> {
        let _guard = self.lock_config();
        let list = self.snapshot();

        if list.iter().any(|s| s.name == sink_type) {
            return Err(DispatcherError::duplicate_sink(sink_type));
        }

        let factory = registry
            .lookup(sink_type)
            .ok_or_else(|| DispatcherError::unknown_sink_type(sink_type))?;

        let mut sink = factory();
        sink.init(config)
            .map_err(|e| DispatcherError::sink_init(sink_type, e))?;

        let mut next: Vec<_> = list.iter().cloned().collect();
        next.push(Arc::new(AttachedSink {
            name: sink_type.to_string(),
            sink,
            metrics: SinkMetrics::new(),
        }));
        self.replace(next);

        debug!(sink = sink_type, "Sink attached");
        Ok(())
    }

    /// Destroy and detach the sink named `sink_type`
    pub(crate) fn detach(&self, sink_type: &str) -> Result<(), DispatcherError> {
        let _guard = self.lock_config();
        let list = self.snapshot();

        let (removed, kept): (Vec<_>, Vec<_>) =
            list.iter().cloned().partition(|s| s.name == sink_type);
        if removed.is_empty() {
            return Err(DispatcherError::unknown_sink_type(sink_type));
        }

        self.replace(kept);
        for entry in removed {
            entry.sink.destroy();
        }

        debug!(sink = sink_type, "Sink detached");
        Ok(())
    }

    /// Fan a record out to every sink, in attach order
    pub(crate) fn write_all(&self, record: &LogRecord) {
        for entry in self.snapshot().iter() {
            entry.write(record);
        }
    }

    pub(crate) fn flush_all(&self) {
        for entry in self.snapshot().iter() {
            entry.flush();
        }
    }

    /// Destroy every sink and leave the set empty
    pub(crate) fn destroy_all(&self) {
        let _guard = self.lock_config();
        let list = self.replace(Vec::new());
        for entry in list.iter() {
            entry.sink.destroy();
        }
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.snapshot().iter().map(|s| s.name.clone()).collect()
    }

    pub(crate) fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.snapshot()
            .iter()
            .map(|s| (s.name.clone(), s.metrics.snapshot()))
            .collect()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}
