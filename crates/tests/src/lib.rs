//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置与合约快照测试
//! - 端到端测试：配置 -> Dispatcher -> FileSink（轮转、压缩、关闭时排空）
//! - 多生产者并发下的顺序与隔离性

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{LogLevel, LoggerConfig, CONSOLE_SINK};

    #[test]
    fn test_default_config_is_console_debug() {
        let config = LoggerConfig::default();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.sinks.len(), 1);
        assert_eq!(config.sinks[0].sink_type, CONSOLE_SINK);
    }

    #[test]
    fn test_config_survives_toml_serialization() {
        let text = r#"
level = "WARN"
async = true
queue_capacity = 64

[[sinks]]
type = "file"
config = { filename = "logs/app.log", maxlines = 10 }
"#;
        let config = ConfigLoader::load_from_str(text, ConfigFormat::Toml).unwrap();
        let rendered = ConfigLoader::to_toml(&config).unwrap();
        let reloaded = ConfigLoader::load_from_str(&rendered, ConfigFormat::Toml).unwrap();

        assert_eq!(reloaded.level, LogLevel::Warn);
        assert!(reloaded.asynchronous);
        assert_eq!(reloaded.queue_capacity, 64);
        assert_eq!(reloaded.sinks[0].config["maxlines"], 10);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::fs::{self, File};
    use std::io::Read;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use dispatcher::sinks::file::naming::{self, RotatedKind};
    use dispatcher::testing::{Captured, MemorySink};
    use dispatcher::{logger_info, Dispatcher, LogLevel, Sink, SinkRegistry};
    use flate2::read::GzDecoder;

    fn file_config(log: &Path, asynchronous: bool, extra: serde_json::Value) -> String {
        let mut sink = serde_json::json!({ "filename": log, "daily": false });
        if let (Some(sink), Some(extra)) = (sink.as_object_mut(), extra.as_object()) {
            sink.extend(extra.clone());
        }
        serde_json::json!({
            "level": "DEBUG",
            "async": asynchronous,
            "queue_capacity": 16,
            "call_site": false,
            "sinks": [{ "type": "file", "config": sink }]
        })
        .to_string()
    }

    fn dispatcher_for(config: &str) -> Arc<Dispatcher> {
        let config = ConfigLoader::load_from_str(config, ConfigFormat::Json).unwrap();
        Arc::new(Dispatcher::from_config(&config).unwrap())
    }

    fn rotated_files(dir: &Path, base: &str) -> Vec<(PathBuf, RotatedKind)> {
        let mut files: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                naming::parse_rotated(base, &name).map(|kind| (e.path(), kind))
            })
            .collect();
        files.sort_by(|a, b| a.0.cmp(&b.0));
        files
    }

    fn gunzip(path: &Path) -> String {
        let mut text = String::new();
        GzDecoder::new(File::open(path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        text
    }

    /// Producer -> queued Dispatcher -> FileSink
    ///
    /// 验证：
    /// 1. close 排空队列，所有记录落盘
    /// 2. 同一生产者的记录保持提交顺序
    #[tokio::test]
    async fn test_e2e_async_close_drains_everything() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");
        let dispatcher = dispatcher_for(&file_config(&log, true, serde_json::json!({})));
        assert!(dispatcher.is_async());

        let producers = 8;
        let per_producer = 250;
        let handles: Vec<_> = (0..producers)
            .map(|p| {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::task::spawn_blocking(move || {
                    for seq in 0..per_producer {
                        logger_info!(dispatcher, "p={} seq={}", p, seq);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let closer = Arc::clone(&dispatcher);
        tokio::task::spawn_blocking(move || closer.close())
            .await
            .unwrap();

        let content = fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), producers * per_producer);

        let mut next: HashMap<usize, usize> = HashMap::new();
        for line in lines {
            let tail = line.split("[INFO] ").nth(1).unwrap();
            let mut parts = tail.split_whitespace();
            let p: usize = parts.next().unwrap()[2..].parse().unwrap();
            let seq: usize = parts.next().unwrap()[4..].parse().unwrap();
            let expected = next.entry(p).or_insert(0);
            assert_eq!(seq, *expected, "producer {p} out of order");
            *expected += 1;
        }
    }

    /// 轮转 + 后台压缩：关闭后所有轮转文件都已压缩，内容完整
    #[tokio::test]
    async fn test_e2e_rotation_compresses_and_keeps_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");
        let dispatcher =
            dispatcher_for(&file_config(&log, false, serde_json::json!({ "maxlines": 100 })));

        let writer = Arc::clone(&dispatcher);
        tokio::task::spawn_blocking(move || {
            for i in 0..350 {
                writer.info(format_args!("record {i}"));
            }
            writer.close();
        })
        .await
        .unwrap();

        let rotated = rotated_files(dir.path(), "app");
        assert_eq!(rotated.len(), 3, "{rotated:?}");
        assert!(rotated.iter().all(|(_, kind)| *kind == RotatedKind::Archived));

        let archived_lines: usize = rotated
            .iter()
            .map(|(path, _)| gunzip(path).lines().count())
            .sum();
        let active_lines = fs::read_to_string(&log).unwrap().lines().count();
        assert_eq!(archived_lines, 300);
        assert_eq!(active_lines, 50);
    }

    /// 单个 sink 失败不影响其他 sink
    #[tokio::test]
    async fn test_e2e_failing_sink_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");

        let registry = Arc::new(SinkRegistry::with_builtin());
        let broken = Captured::new();
        let shared = broken.clone();
        registry.register("broken", move || {
            Box::new(MemorySink::new(shared.clone()).failing()) as Box<dyn Sink>
        });

        let dispatcher = Dispatcher::builder()
            .registry(registry)
            .call_site(false)
            .build();
        dispatcher.set_sink("broken", "{}").unwrap();
        dispatcher
            .set_sink(
                "file",
                &serde_json::json!({ "filename": log, "logLevel": "WARN" }).to_string(),
            )
            .unwrap();
        dispatcher.enable_async().unwrap();

        let dispatcher = Arc::new(dispatcher);
        let writer = Arc::clone(&dispatcher);
        let metrics = tokio::task::spawn_blocking(move || {
            writer.info(format_args!("below file threshold"));
            writer.warn(format_args!("kept"));
            writer.error(format_args!("kept too"));
            writer.flush();
            let metrics = writer.metrics();
            writer.close();
            metrics
        })
        .await
        .unwrap();

        let content = fs::read_to_string(&log).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("[WARN] kept"));
        assert!(broken.is_empty());

        let by_name: HashMap<_, _> = metrics.into_iter().collect();
        assert_eq!(by_name["broken"].failure_count, 3);
        assert_eq!(by_name["file"].write_count, 3);
        assert_eq!(by_name["file"].failure_count, 0);
    }

    /// 级别阈值在运行时可调整
    #[tokio::test]
    async fn test_e2e_runtime_level_change() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");
        let dispatcher = dispatcher_for(&file_config(&log, false, serde_json::json!({})));

        let writer = Arc::clone(&dispatcher);
        tokio::task::spawn_blocking(move || {
            writer.debug(format_args!("one"));
            writer.set_level(LogLevel::Error);
            writer.warn(format_args!("dropped"));
            writer.fatal(format_args!("two"));
            writer.close();
        })
        .await
        .unwrap();

        let content = fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[DEBUG] one"));
        assert!(lines[1].ends_with("[FATAL] two"));
    }
}
