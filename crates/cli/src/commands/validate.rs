//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{LoggerConfig, FILE_SINK};
use dispatcher::sinks::file::config::FileSinkConfig;
use dispatcher::SinkRegistry;
use serde::Serialize;
use tracing::info;

use super::load_config;
use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    level: String,
    asynchronous: bool,
    queue_capacity: usize,
    call_site: bool,
    sinks: Vec<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        Err(CliError::config_validation(result.error.unwrap_or_default()).into())
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    let checked = load_config(&args.config).and_then(|config| {
        check_sinks(&config)?;
        Ok(config)
    });

    match checked {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    level: config.level.to_string(),
                    asynchronous: config.asynchronous,
                    queue_capacity: config.queue_capacity,
                    call_site: config.call_site,
                    sinks: config.sinks.iter().map(|s| s.sink_type.clone()).collect(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("{e:#}")),
            warnings: None,
            summary: None,
        },
    }
}

/// Sink-level checks that do not touch the filesystem
fn check_sinks(config: &LoggerConfig) -> Result<()> {
    let registry = SinkRegistry::global();
    for spec in &config.sinks {
        if registry.lookup(&spec.sink_type).is_none() {
            anyhow::bail!("unknown sink type '{}'", spec.sink_type);
        }
        if spec.sink_type == FILE_SINK {
            FileSinkConfig::from_json(&spec.config_text())
                .and_then(FileSinkConfig::into_settings)
                .with_context(|| format!("invalid '{}' sink config", spec.sink_type))?;
        }
    }
    Ok(())
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &LoggerConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.sinks.is_empty() {
        warnings.push("No sinks configured - records will be dropped".to_string());
    }

    for spec in config.sinks.iter().filter(|s| s.sink_type == FILE_SINK) {
        let Ok(settings) =
            FileSinkConfig::from_json(&spec.config_text()).and_then(FileSinkConfig::into_settings)
        else {
            continue;
        };
        let file = settings.path.display();
        if !settings.rotate {
            warnings.push(format!("File sink '{file}' never rotates"));
        }
        if settings.retention.max_days == 0 && settings.retention.max_total_bytes == 0 {
            warnings.push(format!("File sink '{file}' keeps rotated files forever"));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Level: {}", summary.level);
            println!("  Async: {}", summary.asynchronous);
            println!("  Queue capacity: {}", summary.queue_capacity);
            println!("  Call site: {}", summary.call_site);
            println!("  Sinks: {}", summary.sinks.join(", "));
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn validate_text(name: &str, body: &str) -> ValidationResult {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        validate_config(&ValidateArgs {
            config: path,
            json: true,
        })
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let result = validate_text(
            "log4g.toml",
            r#"
level = "INFO"

[[sinks]]
type = "file"
config = { filename = "logs/app.log", rotate = false, maxdays = 0, maxTotalSize = 0 }
"#,
        );
        assert!(result.valid, "{:?}", result.error);
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 2);
        assert_eq!(result.summary.unwrap().sinks, vec!["file".to_string()]);
    }

    #[test]
    fn test_unknown_sink_type() {
        let result = validate_text("log4g.json", r#"{ "sinks": [{ "type": "syslog" }] }"#);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("syslog"));
    }

    #[test]
    fn test_bad_file_sink_perm() {
        let result = validate_text(
            "log4g.json",
            r#"{ "sinks": [{ "type": "file", "config": { "filename": "a.log", "perm": "9z" } }] }"#,
        );
        assert!(!result.valid);
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "does/not/exist.toml".into(),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("not found"));
    }
}
