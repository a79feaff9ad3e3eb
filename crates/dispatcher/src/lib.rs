//! # Dispatcher
//!
//! 日志分发模块。
//!
//! 负责：
//! - 按级别过滤并格式化记录（调用位置、`[LEVEL]` 前缀）
//! - Fan-out 到多个 sinks，单个 sink 失败不影响其他 sink
//! - 可选的异步队列：单 worker 保证 FIFO，队列满时阻塞生产者
//! - 内置 `console` / `file` sink，`file` 支持轮转、压缩与保留策略

pub mod dispatcher;
pub mod error;
pub mod global;
pub(crate) mod handle;
pub mod macros;
pub mod metrics;
pub mod registry;
pub(crate) mod sink_set;
pub mod sinks;
pub mod testing;

pub use contracts::{LogLevel, LogRecord, LoggerConfig, Sink, SinkFactory, SinkSpec, SourceLocation};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::DispatcherError;
pub use global::{close_global, install, logger};
pub use metrics::{MetricsSnapshot, QueueSnapshot, SinkMetrics};
pub use registry::SinkRegistry;
pub use sinks::{ConsoleSink, FileSink};
