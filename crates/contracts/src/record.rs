//! LogRecord - the value handed to every sink

use chrono::{DateTime, Local};
use std::fmt;
use std::panic::Location;
use std::path::Path;

use crate::LogLevel;

/// Timestamp layout of the record header, e.g. `2016-04-27 10:18:51.453993`
pub const HEADER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Provider for the execution-context tag attached to debug output.
pub type ContextIdFn = fn() -> Option<String>;

/// Default context id: the numeric id of the calling thread.
pub fn thread_context_id() -> Option<String> {
    let id = format!("{:?}", std::thread::current().id());
    Some(
        id.trim_start_matches("ThreadId(")
            .trim_end_matches(')')
            .to_string(),
    )
}

/// Source position of a logging call.
///
/// Captured at the call site (`#[track_caller]` or `file!()`/`line!()`),
/// so wrapper functions never shift it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// Location of the caller of the enclosing `#[track_caller]` chain
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }

    /// File name without directories
    pub fn file_name(&self) -> &str {
        Path::new(self.file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(self.file)
    }
}

impl From<&'static Location<'static>> for SourceLocation {
    fn from(loc: &'static Location<'static>) -> Self {
        Self::new(loc.file(), loc.line())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.file_name(), self.line)
    }
}

/// One formatted log record.
///
/// Built once by the dispatcher and never mutated; every sink receives the
/// same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    level: LogLevel,
    message: String,
    timestamp: DateTime<Local>,
    context_id: Option<String>,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>, timestamp: DateTime<Local>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp,
            context_id: None,
        }
    }

    /// Record stamped with the current local time
    pub fn now(level: LogLevel, message: impl Into<String>) -> Self {
        Self::new(level, message, Local::now())
    }

    pub fn with_context_id(mut self, context_id: Option<String>) -> Self {
        self.context_id = context_id;
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn context_id(&self) -> Option<&str> {
        self.context_id.as_deref()
    }

    /// `[YYYY-MM-DD HH:MM:SS.ffffff]`
    pub fn header(&self) -> String {
        format!("[{}]", self.timestamp.format(HEADER_TIME_FORMAT))
    }

    /// Full output line, newline-terminated.
    ///
    /// The context id is only included when `with_context` is set and the
    /// record carries one.
    pub fn render_line(&self, with_context: bool) -> String {
        let mut line = self.header();
        if with_context {
            if let Some(id) = &self.context_id {
                line.push('[');
                line.push_str(id);
                line.push(']');
            }
        }
        line.push_str(&self.message);
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2016, 4, 27, 10, 18, 51)
            .unwrap()
            .checked_add_signed(chrono::Duration::microseconds(453_993))
            .unwrap()
    }

    #[test]
    fn test_header_format() {
        let record = LogRecord::new(LogLevel::Info, "[INFO] hello", fixed_time());
        assert_eq!(record.header(), "[2016-04-27 10:18:51.453993]");
    }

    #[test]
    fn test_render_line_with_context() {
        let record = LogRecord::new(LogLevel::Debug, "[DEBUG] x", fixed_time())
            .with_context_id(Some("7".to_string()));
        assert_eq!(
            record.render_line(true),
            "[2016-04-27 10:18:51.453993][7][DEBUG] x\n"
        );
        assert_eq!(
            record.render_line(false),
            "[2016-04-27 10:18:51.453993][DEBUG] x\n"
        );
    }

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation::new("src/app/main.rs", 42);
        assert_eq!(loc.to_string(), "[main.rs:42]");
    }

    #[test]
    fn test_caller_location_points_here() {
        let loc = SourceLocation::caller();
        assert_eq!(loc.file_name(), "record.rs");
    }

    #[test]
    fn test_thread_context_id_is_numeric() {
        let id = thread_context_id().unwrap();
        assert!(id.chars().all(|c| c.is_ascii_digit()), "got {id}");
    }
}
