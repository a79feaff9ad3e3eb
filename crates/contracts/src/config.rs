//! LoggerConfig - Config Loader output
//!
//! Describes a complete logger: threshold, delivery mode and sink list.

use serde::{Deserialize, Serialize};

use crate::LogLevel;

/// Default bounded-queue capacity for asynchronous delivery
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Built-in sink type names
pub const CONSOLE_SINK: &str = "console";
pub const FILE_SINK: &str = "file";

/// Complete logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Dispatcher threshold
    #[serde(default)]
    pub level: LogLevel,

    /// Queued delivery through a dedicated worker
    #[serde(default, rename = "async")]
    pub asynchronous: bool,

    /// Bounded queue capacity (queued mode only)
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Prefix messages with `[file:line]`
    #[serde(default = "default_call_site")]
    pub call_site: bool,

    /// Sinks, attached in order
    #[serde(default)]
    pub sinks: Vec<SinkSpec>,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_call_site() -> bool {
    true
}

impl Default for LoggerConfig {
    /// Single console sink at DEBUG, synchronous
    fn default() -> Self {
        Self {
            level: LogLevel::Debug,
            asynchronous: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            call_site: true,
            sinks: vec![SinkSpec::new(
                CONSOLE_SINK,
                serde_json::json!({ "logLevel": "DEBUG" }),
            )],
        }
    }
}

/// One sink entry: registry type name plus its type-specific config object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkSpec {
    /// Registry type name (`console`, `file`, ...)
    #[serde(rename = "type")]
    pub sink_type: String,

    /// Type-specific parameters, handed to `Sink::init` as JSON text
    #[serde(default)]
    pub config: serde_json::Value,
}

impl SinkSpec {
    pub fn new(sink_type: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            sink_type: sink_type.into(),
            config,
        }
    }

    /// JSON text for `Sink::init`; an absent config becomes `{}`
    pub fn config_text(&self) -> String {
        if self.config.is_null() {
            "{}".to_string()
        } else {
            self.config.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_console_debug() {
        let config = LoggerConfig::default();
        assert_eq!(config.level, LogLevel::Debug);
        assert!(!config.asynchronous);
        assert_eq!(config.sinks.len(), 1);
        assert_eq!(config.sinks[0].sink_type, CONSOLE_SINK);
    }

    #[test]
    fn test_config_text_of_missing_config() {
        let spec: SinkSpec = serde_json::from_str(r#"{ "type": "console" }"#).unwrap();
        assert_eq!(spec.config_text(), "{}");
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: LoggerConfig = serde_json::from_str(r#"{ "level": "WARN" }"#).unwrap();
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert!(config.call_site);
        assert!(config.sinks.is_empty());
    }
}
