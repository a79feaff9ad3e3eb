//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use dispatcher::LogLevel;
use std::path::PathBuf;

/// logpipe - leveled log dispatch with rotating, compressing file output
#[derive(Parser, Debug)]
#[command(
    name = "logpipe",
    author,
    version,
    about = "Leveled log dispatcher with rotating file sinks",
    long_about = "Drive, validate and inspect a log dispatch configuration.\n\n\
                  A configuration lists sinks (console, file) with their JSON settings; \n\
                  file sinks rotate by lines, size or day, gzip rotated files and prune \n\
                  old ones."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "LOGPIPE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Diagnostic output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "LOGPIPE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Push generated records through a configured dispatcher
    Emit(EmitArgs),

    /// Validate configuration file without writing anything
    Validate(ValidateArgs),

    /// Display configuration and rotated-file inventory
    Info(InfoArgs),
}

/// Arguments for the `emit` command
#[derive(Parser, Debug, Clone)]
pub struct EmitArgs {
    /// Path to configuration file (TOML or JSON); defaults to
    /// `$APP_BASE_DIR/conf/log4g.*` or a console sink
    #[arg(short, long, env = "LOGPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Records written by each producer
    #[arg(short = 'n', long, default_value = "1000", env = "LOGPIPE_COUNT")]
    pub count: u64,

    /// Concurrent producer tasks
    #[arg(short, long, default_value = "4", env = "LOGPIPE_PRODUCERS")]
    pub producers: usize,

    /// Level of generated records
    #[arg(long, default_value = "INFO", value_parser = parse_level)]
    pub level: LogLevel,

    /// Message body appended after the producer / sequence tags
    #[arg(long, default_value = "sample record")]
    pub message: String,

    /// Force queued delivery even if the configuration is synchronous
    #[arg(long = "async")]
    pub asynchronous: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "LOGPIPE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "conf/log4g.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "conf/log4g.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List every rotated file, not only the totals
    #[arg(long)]
    pub files: bool,
}

/// Diagnostic output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

fn parse_level(value: &str) -> Result<LogLevel, String> {
    value.parse::<LogLevel>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_emit() {
        let cli = Cli::try_parse_from([
            "logpipe", "emit", "-n", "10", "-p", "2", "--level", "warn", "--async",
        ])
        .unwrap();
        match cli.command {
            Commands::Emit(args) => {
                assert_eq!(args.count, 10);
                assert_eq!(args.producers, 2);
                assert_eq!(args.level, LogLevel::Warn);
                assert!(args.asynchronous);
                assert!(args.config.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_level() {
        assert!(Cli::try_parse_from(["logpipe", "emit", "--level", "loud"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["logpipe", "-v", "-q", "info"]).is_err());
    }
}
