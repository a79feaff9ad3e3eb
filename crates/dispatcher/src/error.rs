//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// No factory registered under this type name
    #[error("unknown sink type '{sink_type}' (forgotten register?)")]
    UnknownSinkType { sink_type: String },

    /// A sink of this type is already attached
    #[error("duplicate sink type '{sink_type}' is being set")]
    DuplicateSink { sink_type: String },

    /// Sink `init` failed
    #[error("failed to initialize sink '{sink_type}': {source}")]
    SinkInit {
        sink_type: String,
        #[source]
        source: contracts::ContractError,
    },

    /// Dispatcher already closed
    #[error("dispatcher is closed")]
    Closed,

    /// Worker thread could not be started
    #[error("failed to spawn dispatcher worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// Sink/config error (from contract)
    #[error("contract error: {0}")]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    pub fn unknown_sink_type(sink_type: impl Into<String>) -> Self {
        Self::UnknownSinkType {
            sink_type: sink_type.into(),
        }
    }

    pub fn duplicate_sink(sink_type: impl Into<String>) -> Self {
        Self::DuplicateSink {
            sink_type: sink_type.into(),
        }
    }

    /// Create a sink init error
    pub fn sink_init(sink_type: impl Into<String>, source: contracts::ContractError) -> Self {
        Self::SinkInit {
            sink_type: sink_type.into(),
            source,
        }
    }
}
