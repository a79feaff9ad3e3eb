//! FileSink configuration (JSON)

use std::path::{Path, PathBuf};
use std::time::Duration;

use contracts::{ContractError, LogLevel};
use serde::{Deserialize, Deserializer};

pub const MB: u64 = 1024 * 1024;

const DEFAULT_MAX_LINES: i64 = 1_000_000;
const DEFAULT_MAX_SIZE_MB: i64 = 256;
const DEFAULT_MAX_TOTAL_SIZE_MB: i64 = 1024;
const DEFAULT_MAX_DAYS: i64 = 7;
const DEFAULT_PERM: u32 = 0o660;
const DEFAULT_BACKGROUND_TIMEOUT_MS: u64 = 5_000;

/// Raw configuration as written by users
///
/// ```json
/// { "filename": "logs/app.log", "maxlines": 10000, "maxsize": 256,
///   "daily": true, "maxdays": 15, "rotate": true, "perm": "0600" }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    pub filename: String,
    #[serde(alias = "maxlines", alias = "maxLines")]
    pub max_lines: i64,
    /// Megabytes
    #[serde(alias = "maxsize", alias = "maxSize")]
    pub max_size: i64,
    /// Megabytes
    #[serde(alias = "maxTotalSize", alias = "maxtotalsize")]
    pub max_total_size: i64,
    pub daily: bool,
    #[serde(alias = "maxdays", alias = "maxDays")]
    pub max_days: i64,
    pub rotate: bool,
    #[serde(alias = "logLevel", alias = "loglevel")]
    pub log_level: String,
    #[serde(deserialize_with = "deserialize_perm")]
    pub perm: u32,
    /// Bound on how long `destroy` waits for background compression
    #[serde(alias = "backgroundTimeoutMs")]
    pub background_timeout_ms: u64,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            filename: String::new(),
            max_lines: DEFAULT_MAX_LINES,
            max_size: DEFAULT_MAX_SIZE_MB,
            max_total_size: DEFAULT_MAX_TOTAL_SIZE_MB,
            daily: true,
            max_days: DEFAULT_MAX_DAYS,
            rotate: true,
            log_level: LogLevel::Debug.as_str().to_string(),
            perm: DEFAULT_PERM,
            background_timeout_ms: DEFAULT_BACKGROUND_TIMEOUT_MS,
        }
    }
}

impl FileSinkConfig {
    /// Parse JSON text; unknown fields are ignored
    pub fn from_json(text: &str) -> Result<Self, ContractError> {
        if text.trim().is_empty() {
            return Err(ContractError::missing_field("filename"));
        }
        Ok(serde_json::from_str(text)?)
    }

    /// Validate and derive the runtime settings
    pub fn into_settings(self) -> Result<FileSettings, ContractError> {
        if self.filename.trim().is_empty() {
            return Err(ContractError::missing_field("filename"));
        }

        let path = PathBuf::from(&self.filename);
        let base_name = base_name_of(&path)?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(FileSettings {
            path,
            dir,
            base_name,
            perm: self.perm,
            rotate: self.rotate,
            rotation: RotationPolicy {
                max_lines: non_negative(self.max_lines),
                max_bytes: non_negative(self.max_size).saturating_mul(MB),
                daily: self.daily,
            },
            retention: RetentionPolicy {
                max_days: non_negative(self.max_days),
                max_total_bytes: non_negative(self.max_total_size).saturating_mul(MB),
            },
            level: LogLevel::parse_lenient(&self.log_level),
            background_timeout: Duration::from_millis(self.background_timeout_ms),
        })
    }
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// File stem used as the prefix of rotated files (`logs/app.log` -> `app`)
fn base_name_of(path: &Path) -> Result<String, ContractError> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ContractError::invalid_value("filename", "path has no file name"))
}

/// Permission bits: a JSON number (decimal) or an octal string such as "0640"
fn deserialize_perm<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Perm {
        Number(u32),
        Text(String),
    }

    match Perm::deserialize(deserializer)? {
        Perm::Number(n) => Ok(n),
        Perm::Text(s) => {
            let digits = s.trim().trim_start_matches("0o");
            u32::from_str_radix(digits, 8).map_err(serde::de::Error::custom)
        }
    }
}

/// Rotation thresholds; zero disables a trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub max_lines: u64,
    pub max_bytes: u64,
    pub daily: bool,
}

/// Retention budgets; zero disables a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_days: u64,
    pub max_total_bytes: u64,
}

/// Validated FileSink settings
#[derive(Debug, Clone)]
pub struct FileSettings {
    /// Active file
    pub path: PathBuf,
    /// Directory holding active and rotated files
    pub dir: PathBuf,
    pub base_name: String,
    pub perm: u32,
    pub rotate: bool,
    pub rotation: RotationPolicy,
    pub retention: RetentionPolicy,
    pub level: LogLevel,
    pub background_timeout: Duration,
}
