//! Dispatcher - level filter and fan-out to sinks
//!
//! Two delivery modes:
//! - direct: the calling thread writes to every sink
//! - queued: records go through a bounded queue drained by one worker
//!   thread, which gives FIFO delivery across all callers

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use contracts::{
    thread_context_id, ContextIdFn, LogLevel, LogRecord, LoggerConfig, SourceLocation,
    DEFAULT_QUEUE_CAPACITY,
};
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;
use crate::handle::QueueHandle;
use crate::metrics::{MetricsSnapshot, QueueMetrics, QueueSnapshot};
use crate::registry::SinkRegistry;
use crate::sink_set::SinkSet;

/// Delivery mode
enum Mode {
    Direct,
    Queued(QueueHandle),
    Closed,
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    level: LogLevel,
    call_site: bool,
    queue_capacity: usize,
    registry: Option<Arc<SinkRegistry>>,
    context_id: ContextIdFn,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self {
            level: LogLevel::Debug,
            call_site: true,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            registry: None,
            context_id: thread_context_id,
        }
    }
}

impl DispatcherBuilder {
    /// Create a new DispatcherBuilder
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Prefix messages with the caller's `[file:line]`
    pub fn call_site(mut self, enabled: bool) -> Self {
        self.call_site = enabled;
        self
    }

    /// Capacity of the queue used after `enable_async` (minimum 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Resolve sink types through `registry` instead of the process-wide one
    pub fn registry(mut self, registry: Arc<SinkRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Source of the execution-context tag stored on each record
    pub fn context_id(mut self, provider: ContextIdFn) -> Self {
        self.context_id = provider;
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            sinks: Arc::new(SinkSet::default()),
            registry: self.registry.unwrap_or_else(SinkRegistry::global),
            level: AtomicU8::new(level_to_u8(self.level)),
            call_site: AtomicBool::new(self.call_site),
            context_id: self.context_id,
            queue_capacity: self.queue_capacity,
            queue_metrics: Arc::new(QueueMetrics::new()),
            mode: RwLock::new(Mode::Direct),
        }
    }
}

/// Fans records out to attached sinks
pub struct Dispatcher {
    sinks: Arc<SinkSet>,
    registry: Arc<SinkRegistry>,
    level: AtomicU8,
    call_site: AtomicBool,
    context_id: ContextIdFn,
    queue_capacity: usize,
    queue_metrics: Arc<QueueMetrics>,
    mode: RwLock<Mode>,
}

impl Dispatcher {
    /// Dispatcher with default settings and no sinks
    pub fn new() -> Self {
        DispatcherBuilder::new().build()
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Build a dispatcher from a logger configuration
    ///
    /// Sinks are attached in order; the first failure is returned and the
    /// partially built dispatcher is closed.
    #[instrument(
        name = "dispatcher_from_config",
        skip(config),
        fields(sink_count = config.sinks.len(), asynchronous = config.asynchronous)
    )]
    pub fn from_config(config: &LoggerConfig) -> Result<Self, DispatcherError> {
        Self::from_config_with(config, DispatcherBuilder::new())
    }

    /// Same as `from_config`, starting from a customized builder
    pub fn from_config_with(
        config: &LoggerConfig,
        builder: DispatcherBuilder,
    ) -> Result<Self, DispatcherError> {
        let dispatcher = builder
            .level(config.level)
            .call_site(config.call_site)
            .queue_capacity(config.queue_capacity)
            .build();

        for spec in &config.sinks {
            if let Err(e) = dispatcher.set_sink(&spec.sink_type, &spec.config_text()) {
                dispatcher.close();
                return Err(e);
            }
        }

        if config.asynchronous {
            dispatcher.enable_async()?;
        }
        Ok(dispatcher)
    }

    /// Attach a sink of `sink_type`, initialized with `config`
    ///
    /// # Errors
    /// `UnknownSinkType`, `DuplicateSink`, `SinkInit`, or `Closed`
    #[instrument(name = "dispatcher_set_sink", skip(self, config))]
    pub fn set_sink(&self, sink_type: &str, config: &str) -> Result<(), DispatcherError> {
        if self.is_closed() {
            return Err(DispatcherError::Closed);
        }
        self.sinks.attach(&self.registry, sink_type, config)
    }

    /// Destroy and detach the sink of `sink_type`
    #[instrument(name = "dispatcher_remove_sink", skip(self))]
    pub fn remove_sink(&self, sink_type: &str) -> Result<(), DispatcherError> {
        self.sinks.detach(sink_type)
    }

    /// Switch to queued delivery and start the worker
    ///
    /// Calling it again while queued is a no-op.
    #[instrument(name = "dispatcher_enable_async", skip(self))]
    pub fn enable_async(&self) -> Result<(), DispatcherError> {
        let mut mode = self.mode.write().unwrap_or_else(PoisonError::into_inner);
        match *mode {
            Mode::Queued(_) => Ok(()),
            Mode::Closed => Err(DispatcherError::Closed),
            Mode::Direct => {
                let handle = QueueHandle::spawn(
                    Arc::clone(&self.sinks),
                    self.queue_capacity,
                    Arc::clone(&self.queue_metrics),
                )?;
                *mode = Mode::Queued(handle);
                info!(capacity = self.queue_capacity, "Asynchronous delivery enabled");
                Ok(())
            }
        }
    }

    /// Emit one record.
    ///
    /// No-op when `level` is below the threshold or the dispatcher is
    /// closed. In queued mode this blocks while the queue is full.
    pub fn log(&self, level: LogLevel, location: SourceLocation, args: fmt::Arguments<'_>) {
        if !level.passes(self.level()) {
            return;
        }

        let record = self.build_record(level, location, args);

        let sender = {
            let mode = self.mode.read().unwrap_or_else(PoisonError::into_inner);
            match &*mode {
                Mode::Direct => None,
                Mode::Queued(handle) => Some(handle.sender()),
                Mode::Closed => return,
            }
        };

        match sender {
            // Sent outside the mode lock so close() is never blocked by a full queue
            Some(sender) => {
                if !sender.send(record) {
                    warn!("Dispatcher closed, record dropped");
                }
            }
            None => self.sinks.write_all(&record),
        }
    }

    fn build_record(
        &self,
        level: LogLevel,
        location: SourceLocation,
        args: fmt::Arguments<'_>,
    ) -> LogRecord {
        let message = if self.call_site.load(Ordering::Relaxed) {
            format!("{location}[{level}] {args}")
        } else {
            format!("[{level}] {args}")
        };
        LogRecord::now(level, message).with_context_id((self.context_id)())
    }

    #[track_caller]
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Debug, SourceLocation::caller(), args);
    }

    #[track_caller]
    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Info, SourceLocation::caller(), args);
    }

    #[track_caller]
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Warn, SourceLocation::caller(), args);
    }

    #[track_caller]
    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Error, SourceLocation::caller(), args);
    }

    #[track_caller]
    pub fn fatal(&self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Fatal, SourceLocation::caller(), args);
    }

    /// Flush every sink.
    ///
    /// In queued mode this waits until the worker has written everything
    /// queued before the call and flushed every sink.
    pub fn flush(&self) {
        let mode = self.mode.read().unwrap_or_else(PoisonError::into_inner);
        match &*mode {
            Mode::Direct => self.sinks.flush_all(),
            Mode::Queued(handle) => {
                if let Err(e) = handle.flush() {
                    warn!(error = %e, "Flush skipped");
                }
            }
            Mode::Closed => {}
        }
    }

    /// Drain, flush and destroy every sink. Terminal.
    #[instrument(name = "dispatcher_close", skip(self))]
    pub fn close(&self) {
        let previous = {
            let mut mode = self.mode.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *mode, Mode::Closed)
        };

        match previous {
            Mode::Direct => {
                self.sinks.flush_all();
                self.sinks.destroy_all();
            }
            Mode::Queued(handle) => handle.shutdown(),
            Mode::Closed => return,
        }

        debug!("Dispatcher closed");
    }

    pub fn level(&self) -> LogLevel {
        level_from_u8(self.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level_to_u8(level), Ordering::Relaxed);
    }

    pub fn set_call_site(&self, enabled: bool) {
        self.call_site.store(enabled, Ordering::Relaxed);
    }

    pub fn is_async(&self) -> bool {
        matches!(
            *self.mode.read().unwrap_or_else(PoisonError::into_inner),
            Mode::Queued(_)
        )
    }

    pub fn is_closed(&self) -> bool {
        matches!(
            *self.mode.read().unwrap_or_else(PoisonError::into_inner),
            Mode::Closed
        )
    }

    /// Attached sink type names, in fan-out order
    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.names()
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.sinks.metrics()
    }

    pub fn queue_metrics(&self) -> QueueSnapshot {
        self.queue_metrics.snapshot()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.close();
    }
}

fn level_to_u8(level: LogLevel) -> u8 {
    level as u8
}

fn level_from_u8(value: u8) -> LogLevel {
    LogLevel::ALL
        .get(value as usize)
        .copied()
        .unwrap_or(LogLevel::Fatal)
}
