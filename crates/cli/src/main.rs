//! # logpipe CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 多生产者驱动 Dispatcher，输出 sink 统计
//! - 轮转文件清单查看
//! - 优雅关闭处理

mod cli;
mod commands;
mod error;

use anyhow::Result;
use clap::Parser;
use observability::{LogFormat, ObservabilityConfig};
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_emit, run_info, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging based on CLI options
    init_logging(&cli)?;

    info!(version = env!("CARGO_PKG_VERSION"), "logpipe starting");

    // Execute command
    let result = match &cli.command {
        Commands::Emit(args) => run_emit(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
fn init_logging(cli: &Cli) -> Result<()> {
    observability::init_with_config(observability_config(cli))
}

fn observability_config(cli: &Cli) -> ObservabilityConfig {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    ObservabilityConfig {
        log_format: match cli.log_format {
            cli::LogFormat::Json => LogFormat::Json,
            cli::LogFormat::Pretty => LogFormat::Pretty,
            cli::LogFormat::Compact => LogFormat::Compact,
        },
        // metrics are installed by `emit --metrics-port`
        metrics_port: None,
        default_log_level: default_log_level.to_string(),
        use_env_filter: !cli.quiet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ObservabilityConfig {
        observability_config(&Cli::try_parse_from(args).unwrap())
    }

    #[test]
    fn test_observability_config_from_flags() {
        let config = parse(&["logpipe", "-vv", "--log-format", "json", "info"]);
        assert_eq!(config.default_log_level, "trace");
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.use_env_filter);

        let config = parse(&["logpipe", "-q", "info"]);
        assert_eq!(config.default_log_level, "warn");
        assert!(!config.use_env_filter);
        assert_eq!(config.metrics_port, None);
    }
}
