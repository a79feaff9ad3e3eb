//! Sink trait - Dispatcher output interface
//!
//! Defines the abstract interface for Sinks.

use std::sync::Arc;

use crate::{ContractError, LogLevel, LogRecord};

/// Log destination
///
/// All sink implementations must implement this trait. Writes may arrive
/// from several threads at once (direct mode), so implementations guard
/// their own mutable state.
pub trait Sink: Send + Sync {
    /// Apply configuration text (JSON object, unknown fields ignored)
    ///
    /// # Errors
    /// `MissingField` / `ConfigParse` / `Io` when the sink cannot start
    fn init(&mut self, config: &str) -> Result<(), ContractError>;

    /// Write one record
    ///
    /// Records below the sink's own threshold are accepted and ignored.
    fn write_msg(&self, record: &LogRecord) -> Result<(), ContractError>;

    /// Push buffered data to durable storage
    fn flush(&self) -> Result<(), ContractError>;

    /// Release resources; no further writes are valid afterwards
    fn destroy(&self);

    /// Threshold applied by this sink
    fn level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

/// Produces a fresh, uninitialized sink instance
pub type SinkFactory = Arc<dyn Fn() -> Box<dyn Sink> + Send + Sync>;
