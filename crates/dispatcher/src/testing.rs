//! In-memory sink for tests and embedding
//!
//! `MemorySink` records every accepted record into a shared `Captured`
//! buffer. A `Gate` can hold writes open to simulate a slow sink.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use contracts::{ContractError, LogLevel, LogRecord, Sink, SinkFactory};
use serde::Deserialize;

#[derive(Default)]
struct CapturedInner {
    records: Mutex<Vec<LogRecord>>,
    flushes: AtomicUsize,
    destroyed: AtomicBool,
}

/// Shared view of what the memory sinks received
#[derive(Clone, Default)]
pub struct Captured(Arc<CapturedInner>);

impl Captured {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogRecord> {
        self.0
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records()
            .iter()
            .map(|r| r.message().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flush_count(&self) -> usize {
        self.0.flushes.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> bool {
        self.0.destroyed.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct GateState {
    open: bool,
    entered: usize,
}

/// Blocks writers until opened
#[derive(Default)]
pub struct Gate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Release every blocked writer and stop blocking
    pub fn open(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.open = true;
        self.changed.notify_all();
    }

    /// Wait until at least `n` writes reached the gate
    pub fn wait_entered(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while state.entered < n {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            state = self
                .changed
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn pass(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.entered += 1;
        self.changed.notify_all();
        while !state.open {
            state = self
                .changed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct MemorySinkConfig {
    #[serde(default, rename = "logLevel")]
    log_level: Option<String>,
}

/// Sink that keeps records in memory
pub struct MemorySink {
    captured: Captured,
    gate: Option<Arc<Gate>>,
    fail: bool,
    level: LogLevel,
}

impl MemorySink {
    pub fn new(captured: Captured) -> Self {
        Self {
            captured,
            gate: None,
            fail: false,
            level: LogLevel::Debug,
        }
    }

    /// Every write first passes through `gate`
    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Every write fails
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Factory producing memory sinks that share one `Captured`
    pub fn factory() -> (SinkFactory, Captured) {
        let captured = Captured::new();
        let shared = captured.clone();
        let factory: SinkFactory =
            Arc::new(move || Box::new(MemorySink::new(shared.clone())) as Box<dyn Sink>);
        (factory, captured)
    }
}

impl Sink for MemorySink {
    fn init(&mut self, config: &str) -> Result<(), ContractError> {
        if config.trim().is_empty() {
            return Ok(());
        }
        let parsed: MemorySinkConfig = serde_json::from_str(config)?;
        if let Some(level) = parsed.log_level {
            self.level = LogLevel::parse_lenient(&level);
        }
        Ok(())
    }

    fn write_msg(&self, record: &LogRecord) -> Result<(), ContractError> {
        if !record.level().passes(self.level) {
            return Ok(());
        }
        if let Some(gate) = &self.gate {
            gate.pass();
        }
        if self.fail {
            return Err(ContractError::sink_write("memory", "mock failure"));
        }
        self.captured
            .0
            .records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
        Ok(())
    }

    fn flush(&self) -> Result<(), ContractError> {
        self.captured.0.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn destroy(&self) {
        self.captured.0.destroyed.store(true, Ordering::SeqCst);
    }

    fn level(&self) -> LogLevel {
        self.level
    }
}
