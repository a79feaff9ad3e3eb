//! ConsoleSink - prints one line per record to stdout

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use contracts::{ContractError, LogLevel, LogRecord, Sink};
use serde::Deserialize;
use tracing::instrument;

#[derive(Debug, Default, Deserialize)]
struct ConsoleSinkConfig {
    #[serde(default, rename = "logLevel")]
    log_level: Option<String>,
}

/// Sink that prints records with a timestamp header
pub struct ConsoleSink {
    level: LogLevel,
    /// One record per lock hold, so concurrent lines never interleave
    lock: Mutex<()>,
}

impl ConsoleSink {
    /// Create a new ConsoleSink at DEBUG
    pub fn new() -> Self {
        Self {
            level: LogLevel::Debug,
            lock: Mutex::new(()),
        }
    }

    fn print(&self, record: &LogRecord) -> io::Result<()> {
        let line = record.render_line(true);
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        io::stdout().lock().write_all(line.as_bytes())
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    #[instrument(name = "console_sink_init", skip(self, config))]
    fn init(&mut self, config: &str) -> Result<(), ContractError> {
        if config.trim().is_empty() {
            return Ok(());
        }
        let parsed: ConsoleSinkConfig = serde_json::from_str(config)?;
        if let Some(level) = parsed.log_level {
            self.level = LogLevel::parse_lenient(&level);
        }
        Ok(())
    }

    fn write_msg(&self, record: &LogRecord) -> Result<(), ContractError> {
        if !record.level().passes(self.level) {
            return Ok(());
        }
        self.print(record)
            .map_err(|e| ContractError::sink_write("console", e.to_string()))
    }

    fn flush(&self) -> Result<(), ContractError> {
        io::stdout().flush()?;
        Ok(())
    }

    fn destroy(&self) {}

    fn level(&self) -> LogLevel {
        self.level
    }
}
