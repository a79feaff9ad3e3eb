//! Command implementations.

mod emit;
mod info;
mod validate;

pub use emit::run_emit;
pub use info::run_info;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::LoggerConfig;

use crate::error::CliError;

/// Load an explicit configuration file
fn load_config(path: &Path) -> Result<LoggerConfig> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }
    ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
