//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON logger configuration files
//! - Validate configuration legality
//! - Locate the process default under `$APP_BASE_DIR/conf/`
//! - Generate `LoggerConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("log4g.toml")).unwrap();
//! println!("Sinks: {}", config.sinks.len());
//! ```

mod parser;
mod validator;

pub use contracts::LoggerConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::{Path, PathBuf};

/// Environment variable naming the application base directory
pub const BASE_DIR_ENV: &str = "APP_BASE_DIR";

/// Candidate file names below `<base>/conf/`, in lookup order
pub const DEFAULT_CONFIG_FILES: [&str; 2] = ["log4g.json", "log4g.toml"];

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<LoggerConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<LoggerConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Load the configuration found below `base_dir/conf/`, if any
    ///
    /// Returns `Ok(None)` when no candidate file exists.
    pub fn load_from_base_dir(base_dir: &Path) -> Result<Option<LoggerConfig>, ContractError> {
        match Self::find_in_base_dir(base_dir) {
            Some(path) => Self::load_from_path(&path).map(Some),
            None => Ok(None),
        }
    }

    /// Load the configuration referenced by `$APP_BASE_DIR`, if any
    pub fn load_from_env() -> Result<Option<LoggerConfig>, ContractError> {
        match std::env::var_os(BASE_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::load_from_base_dir(Path::new(&dir)),
            _ => Ok(None),
        }
    }

    /// Environment configuration, or the console default when absent
    pub fn load_or_default() -> Result<LoggerConfig, ContractError> {
        Ok(Self::load_from_env()?.unwrap_or_default())
    }

    /// Serialize LoggerConfig to TOML string
    pub fn to_toml(config: &LoggerConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize LoggerConfig to JSON string
    pub fn to_json(config: &LoggerConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn find_in_base_dir(base_dir: &Path) -> Option<PathBuf> {
        let conf_dir = base_dir.join("conf");
        DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| conf_dir.join(name))
            .find(|path| path.is_file())
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(content: &str, format: ConfigFormat) -> Result<LoggerConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::LogLevel;

    const MINIMAL_TOML: &str = r#"
level = "INFO"
async = true

[[sinks]]
type = "console"
[sinks.config]
logLevel = "WARN"

[[sinks]]
type = "file"
[sinks.config]
filename = "logs/app.log"
maxsize = 16
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.sinks.len(), 2);
    }

    #[test]
    fn test_round_trip_json() {
        let config = ConfigLoader::load_from_str(MINIMAL_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&config).unwrap();
        let config2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(config.sinks.len(), config2.sinks.len());
        assert_eq!(config2.sinks[1].config["maxsize"], 16);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[[sinks]]
type = "file"
[sinks.config]
maxlines = 10
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("filename"));
    }

    #[test]
    fn test_load_from_path_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logger.toml");
        std::fs::write(&path, MINIMAL_TOML).unwrap();
        let config = ConfigLoader::load_from_path(&path).unwrap();
        assert!(config.asynchronous);

        let bad = dir.path().join("logger.yaml");
        std::fs::write(&bad, "level: INFO").unwrap();
        assert!(ConfigLoader::load_from_path(&bad).is_err());
    }

    #[test]
    fn test_load_from_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigLoader::load_from_base_dir(dir.path()).unwrap().is_none());

        let conf = dir.path().join("conf");
        std::fs::create_dir_all(&conf).unwrap();
        std::fs::write(
            conf.join("log4g.json"),
            r#"{ "level": "ERROR", "sinks": [{ "type": "console" }] }"#,
        )
        .unwrap();

        let config = ConfigLoader::load_from_base_dir(dir.path()).unwrap().unwrap();
        assert_eq!(config.level, LogLevel::Error);
    }
}
