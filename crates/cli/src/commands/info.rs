//! `info` command implementation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use contracts::{LoggerConfig, FILE_SINK};
use dispatcher::sinks::file::config::{FileSettings, FileSinkConfig, MB};
use dispatcher::sinks::file::naming::{self, RotatedKind};
use serde::Serialize;
use tracing::{info, warn};

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    level: String,
    asynchronous: bool,
    queue_capacity: usize,
    call_site: bool,
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SinkInfo {
    sink_type: String,
    config: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<FileInventory>,
}

/// Active and rotated files of one file sink
#[derive(Serialize, Default)]
struct FileInventory {
    active: String,
    active_bytes: u64,
    pending_count: usize,
    archived_count: usize,
    rotated_bytes: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rotated: Vec<RotatedFile>,
}

#[derive(Serialize)]
struct RotatedFile {
    name: String,
    bytes: u64,
    compressed: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)?;
    let info = build_config_info(&config);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info, args.files);
    }

    Ok(())
}

fn build_config_info(config: &LoggerConfig) -> ConfigInfo {
    let sinks = config
        .sinks
        .iter()
        .map(|spec| {
            let files = (spec.sink_type == FILE_SINK)
                .then(|| {
                    FileSinkConfig::from_json(&spec.config_text())
                        .and_then(FileSinkConfig::into_settings)
                        .map_err(|e| warn!(error = %e, "Skipping inventory of invalid file sink"))
                        .ok()
                })
                .flatten()
                .map(|settings| inventory(&settings));

            SinkInfo {
                sink_type: spec.sink_type.clone(),
                config: spec.config.clone(),
                files,
            }
        })
        .collect();

    ConfigInfo {
        level: config.level.to_string(),
        asynchronous: config.asynchronous,
        queue_capacity: config.queue_capacity,
        call_site: config.call_site,
        sinks,
    }
}

fn inventory(settings: &FileSettings) -> FileInventory {
    let mut inventory = FileInventory {
        active: settings.path.display().to_string(),
        active_bytes: file_len(&settings.path),
        ..Default::default()
    };

    let entries = match fs::read_dir(&settings.dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %settings.dir.display(), error = %e, "Unable to list log directory");
            return inventory;
        }
    };

    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(kind) = naming::parse_rotated(&settings.base_name, &name) else {
            continue;
        };
        let bytes = file_len(&entry.path());
        match kind {
            RotatedKind::Pending => inventory.pending_count += 1,
            RotatedKind::Archived => inventory.archived_count += 1,
        }
        inventory.rotated_bytes += bytes;
        inventory.rotated.push(RotatedFile {
            name,
            bytes,
            compressed: kind == RotatedKind::Archived,
        });
    }
    inventory.rotated.sort_by(|a, b| a.name.cmp(&b.name));
    inventory
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn human_size(bytes: u64) -> String {
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{bytes} B")
    }
}

fn print_config_info(info: &ConfigInfo, list_files: bool) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  logpipe Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Dispatcher");
    println!("   ├─ Level: {}", info.level);
    println!("   ├─ Async: {}", info.asynchronous);
    println!("   ├─ Queue capacity: {}", info.queue_capacity);
    println!("   └─ Call site: {}", info.call_site);

    println!("\n📤 Sinks ({})", info.sinks.len());
    for (i, sink) in info.sinks.iter().enumerate() {
        let is_last = i == info.sinks.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} {}", prefix, sink.sink_type, sink.config);

        let Some(files) = &sink.files else {
            continue;
        };
        println!(
            "   {}  ├─ Active: {} ({})",
            child_prefix,
            files.active,
            human_size(files.active_bytes)
        );
        println!(
            "   {}  └─ Rotated: {} compressed, {} pending ({})",
            child_prefix,
            files.archived_count,
            files.pending_count,
            human_size(files.rotated_bytes)
        );
        if list_files {
            for file in &files.rotated {
                println!(
                    "   {}       {} ({})",
                    child_prefix,
                    file.name,
                    human_size(file.bytes)
                );
            }
        }
    }

    println!();
}
