//! Layered error definitions
//!
//! Categorized by phase: config (setup time) / sink runtime / background

use std::path::PathBuf;
use thiserror::Error;

/// Unified sink-level error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Required configuration field absent or empty
    #[error("config is missing required field '{field}'")]
    MissingField { field: String },

    /// Configuration field present but unusable
    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== Background Errors =====
    /// Compressing a rotated file failed
    #[error("compression of {} failed: {source}", path.display())]
    Compression {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Deleting a retained file failed
    #[error("retention of {} failed: {source}", path.display())]
    Retention {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Create invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    pub fn compression(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Compression {
            path: path.into(),
            source,
        }
    }

    pub fn retention(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Retention {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for ContractError {
    fn from(e: serde_json::Error) -> Self {
        Self::ConfigParse {
            message: format!("JSON parse error: {e}"),
            source: Some(Box::new(e)),
        }
    }
}
