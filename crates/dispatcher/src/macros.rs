//! Leveled logging macros for a `Dispatcher`.
//!
//! Each macro captures `file!()`/`line!()` at the call site and formats
//! lazily: nothing is rendered when the level is filtered out.
//!
//! ```ignore
//! let logger = Dispatcher::new();
//! logger_info!(logger, "listening on {}", addr);
//! ```

#[macro_export]
macro_rules! logger_log {
    ($logger:expr, $lvl:expr, $($arg:tt)*) => {{
        $logger.log(
            $lvl,
            $crate::SourceLocation::new(file!(), line!()),
            format_args!($($arg)*),
        )
    }};
}

#[macro_export]
macro_rules! logger_debug { ($logger:expr, $($arg:tt)*) => { $crate::logger_log!($logger, $crate::LogLevel::Debug, $($arg)*) } }
#[macro_export]
macro_rules! logger_info  { ($logger:expr, $($arg:tt)*) => { $crate::logger_log!($logger, $crate::LogLevel::Info, $($arg)*) } }
#[macro_export]
macro_rules! logger_warn  { ($logger:expr, $($arg:tt)*) => { $crate::logger_log!($logger, $crate::LogLevel::Warn, $($arg)*) } }
#[macro_export]
macro_rules! logger_error { ($logger:expr, $($arg:tt)*) => { $crate::logger_log!($logger, $crate::LogLevel::Error, $($arg)*) } }
#[macro_export]
macro_rules! logger_fatal { ($logger:expr, $($arg:tt)*) => { $crate::logger_log!($logger, $crate::LogLevel::Fatal, $($arg)*) } }
