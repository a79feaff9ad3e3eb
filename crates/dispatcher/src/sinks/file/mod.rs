//! FileSink - rotating file output
//!
//! Appends records to one active file and rotates it when a line, size or
//! calendar-day threshold is crossed. Rotated files are compressed and
//! pruned by a per-sink janitor thread so the write path only pays for the
//! rename and reopen.
//!
//! Counters live in atomics so the common "no rotation needed" check runs
//! without the write lock; the check is repeated under the lock before
//! rotating, so concurrent writers crossing the same threshold produce a
//! single rotated file.

pub mod archive;
pub mod config;
mod janitor;
pub mod naming;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Datelike, Local};
use contracts::{ContractError, LogLevel, LogRecord, Sink};
use tracing::{error, info, instrument, warn};

use self::archive::ArchivePlan;
use self::config::{FileSettings, FileSinkConfig};
use self::janitor::Janitor;

pub use self::config::{RetentionPolicy, RotationPolicy};

const SCAN_BUFFER_SIZE: usize = 32 * 1024;

/// Rotating, compressing, retention-pruning file sink
pub struct FileSink {
    settings: Option<FileSettings>,
    /// Active handle; `None` before init, after destroy or a failed reopen
    file: Mutex<Option<File>>,
    lines: AtomicU64,
    bytes: AtomicU64,
    /// Day (days from CE, local time) the active file was opened
    open_day: AtomicI32,
    rotations: AtomicU64,
    janitor: Mutex<Option<Janitor>>,
}

impl FileSink {
    /// Create an uninitialized FileSink; `init` must run before writes
    pub fn new() -> Self {
        Self {
            settings: None,
            file: Mutex::new(None),
            lines: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            open_day: AtomicI32::new(0),
            rotations: AtomicU64::new(0),
            janitor: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> Option<&FileSettings> {
        self.settings.as_ref()
    }

    /// Lines in the active file
    pub fn line_count(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    /// Bytes in the active file
    pub fn byte_count(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Rotations performed since init
    pub fn rotation_count(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    fn lock_file(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn needs_rotate(&self, settings: &FileSettings, incoming: u64, day: i32) -> bool {
        if !settings.rotate {
            return false;
        }
        let policy = &settings.rotation;
        (policy.max_lines > 0 && self.lines.load(Ordering::Relaxed) >= policy.max_lines)
            || (policy.max_bytes > 0
                && self.bytes.load(Ordering::Relaxed).saturating_add(incoming) >= policy.max_bytes)
            || (policy.daily && day > self.open_day.load(Ordering::Relaxed))
    }

    /// Open (or reopen) the active file and resynchronize the counters
    ///
    /// The open day only moves forward: a record stamped before midnight that
    /// reaches the lock after a next-day record lands in the new file.
    fn open_active(&self, settings: &FileSettings, day: i32) -> io::Result<File> {
        let file = open_append(&settings.path, settings.perm)?;
        let (lines, bytes) = scan_counters(&settings.path)?;
        self.lines.store(lines, Ordering::Relaxed);
        self.bytes.store(bytes, Ordering::Relaxed);
        self.open_day.fetch_max(day, Ordering::Relaxed);
        Ok(file)
    }

    /// Rename the active file away and start a fresh one; caller holds the lock
    fn rotate_locked(
        &self,
        settings: &FileSettings,
        slot: &mut Option<File>,
        when: &DateTime<Local>,
    ) {
        // close before rename
        drop(slot.take());

        let target = naming::rotated_log_path(&settings.dir, &settings.base_name, when);
        let renamed = match fs::rename(&settings.path, &target) {
            Ok(()) => {
                info!(
                    file = %settings.path.display(),
                    rotated = %target.display(),
                    "Log file rotated"
                );
                self.rotations.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(e) => {
                error!(file = %settings.path.display(), error = %e, "Log rotation rename failed");
                false
            }
        };

        match self.open_active(settings, day_number(when)) {
            Ok(file) => *slot = Some(file),
            Err(e) => {
                error!(file = %settings.path.display(), error = %e, "Log file reopen failed")
            }
        }

        if renamed {
            if let Some(janitor) = self
                .janitor
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .as_ref()
            {
                janitor.request_sweep();
            }
        }
    }

    fn append_locked(&self, slot: &mut Option<File>, line: &str) -> Result<(), ContractError> {
        let file = slot.as_mut().ok_or_else(|| {
            ContractError::Io(io::Error::new(
                io::ErrorKind::NotConnected,
                "log file is not open",
            ))
        })?;
        file.write_all(line.as_bytes())?;

        let newlines = line.bytes().filter(|b| *b == b'\n').count() as u64;
        self.lines.fetch_add(newlines, Ordering::Relaxed);
        self.bytes.fetch_add(line.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

impl Default for FileSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for FileSink {
    #[instrument(name = "file_sink_init", skip(self, config))]
    fn init(&mut self, config: &str) -> Result<(), ContractError> {
        let settings = FileSinkConfig::from_json(config)?.into_settings()?;
        fs::create_dir_all(&settings.dir)?;

        let file = self.open_active(&settings, day_number(&Local::now()))?;
        let janitor = Janitor::spawn(ArchivePlan {
            dir: settings.dir.clone(),
            base_name: settings.base_name.clone(),
            active: settings.path.clone(),
            retention: settings.retention,
        })?;

        info!(
            file = %settings.path.display(),
            lines = self.line_count(),
            bytes = self.byte_count(),
            level = %settings.level,
            "File sink ready"
        );

        self.file = Mutex::new(Some(file));
        self.janitor = Mutex::new(Some(janitor));
        self.settings = Some(settings);
        Ok(())
    }

    fn write_msg(&self, record: &LogRecord) -> Result<(), ContractError> {
        let Some(settings) = self.settings.as_ref() else {
            return Err(ContractError::sink_write("file", "sink is not initialized"));
        };
        if !record.level().passes(settings.level) {
            return Ok(());
        }

        let line = record.render_line(settings.level == LogLevel::Debug);
        let incoming = line.len() as u64;
        let timestamp = record.timestamp();
        let day = day_number(&timestamp);

        let rotate_hint = self.needs_rotate(settings, incoming, day);
        let mut slot = self.lock_file();
        // another writer may have rotated while we waited for the lock
        if rotate_hint && slot.is_some() && self.needs_rotate(settings, incoming, day) {
            self.rotate_locked(settings, &mut slot, &timestamp);
        }
        self.append_locked(&mut slot, &line)
    }

    fn flush(&self) -> Result<(), ContractError> {
        if let Some(file) = self.lock_file().as_ref() {
            file.sync_all()?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_destroy", skip(self))]
    fn destroy(&self) {
        if let Some(file) = self.lock_file().take() {
            if let Err(e) = file.sync_all() {
                warn!(error = %e, "Final sync of log file failed");
            }
        }

        let janitor = self
            .janitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let (Some(janitor), Some(settings)) = (janitor, self.settings.as_ref()) {
            janitor.shutdown(settings.background_timeout);
        }
    }

    fn level(&self) -> LogLevel {
        self.settings
            .as_ref()
            .map(|s| s.level)
            .unwrap_or(LogLevel::Debug)
    }
}

fn day_number(at: &DateTime<Local>) -> i32 {
    at.date_naive().num_days_from_ce()
}

fn open_append(path: &Path, perm: u32) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(perm);
    }
    #[cfg(not(unix))]
    let _ = perm;
    options.open(path)
}

/// (lines, bytes) of an existing file; lines are counted as `\n` bytes
fn scan_counters(path: &Path) -> io::Result<(u64, u64)> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; SCAN_BUFFER_SIZE];
    let mut lines = 0u64;
    let mut bytes = 0u64;
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        lines += buf[..n].iter().filter(|b| **b == b'\n').count() as u64;
        bytes += n as u64;
    }
    Ok((lines, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::thread;

    fn file_sink(dir: &Path, extra: &str) -> FileSink {
        let path = dir.join("app.log");
        let config = format!(
            r#"{{ "filename": {}, "daily": false {extra} }}"#,
            serde_json::to_string(&path.to_string_lossy()).unwrap()
        );
        let mut sink = FileSink::new();
        sink.init(&config).unwrap();
        sink
    }

    fn record(msg: &str) -> LogRecord {
        LogRecord::now(LogLevel::Info, format!("[INFO] {msg}"))
    }

    /// Distinct rotated stems, so a `.log` mid-compression is not counted twice
    fn rotated(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| naming::parse_rotated("app", name).is_some())
            .map(|name| naming::rotated_stem(&name).to_string())
            .collect()
    }

    fn active_lines(dir: &Path) -> Vec<String> {
        fs::read_to_string(dir.join("app.log"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_init_requires_filename() {
        let mut sink = FileSink::new();
        let err = sink.init(r#"{ "maxlines": 3 }"#).unwrap_err();
        assert!(matches!(err, ContractError::MissingField { .. }));
        assert!(sink.write_msg(&record("x")).is_err());
    }

    #[test]
    fn test_init_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let sink = file_sink(&nested, "");
        sink.write_msg(&record("hello")).unwrap();
        sink.destroy();
        assert!(nested.join("app.log").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_perm_applied() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let sink = file_sink(dir.path(), r#", "perm": "0600""#);
        sink.destroy();
        let mode = fs::metadata(dir.path().join("app.log")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_line_format_and_level() {
        let dir = tempfile::tempdir().unwrap();
        let sink = file_sink(dir.path(), r#", "logLevel": "WARN""#);
        sink.write_msg(&record("dropped")).unwrap();
        let warn = LogRecord::now(LogLevel::Warn, "[WARN] kept").with_context_id(Some("9".into()));
        sink.write_msg(&warn).unwrap();
        sink.destroy();

        let lines = active_lines(dir.path());
        assert_eq!(lines.len(), 1);
        // context id only at DEBUG sink level
        assert!(lines[0].ends_with("][WARN] kept"));
        assert!(!lines[0].contains("[9]"));

        let dir = tempfile::tempdir().unwrap();
        let sink = file_sink(dir.path(), "");
        sink.write_msg(&warn).unwrap();
        sink.destroy();
        assert!(active_lines(dir.path())[0].ends_with("][9][WARN] kept"));
    }

    #[test]
    fn test_rotation_on_max_lines() {
        let dir = tempfile::tempdir().unwrap();
        let sink = file_sink(dir.path(), r#", "maxlines": 3"#);

        for i in 0..3 {
            sink.write_msg(&record(&format!("line {i}"))).unwrap();
        }
        assert_eq!(sink.line_count(), 3);
        assert!(rotated(dir.path()).is_empty());

        sink.write_msg(&record("line 3")).unwrap();
        assert_eq!(sink.rotation_count(), 1);
        assert_eq!(sink.line_count(), 1);
        sink.destroy();

        assert_eq!(rotated(dir.path()).len(), 1);
        let lines = active_lines(dir.path());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("line 3"));
    }

    #[test]
    fn test_resume_counts_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log"), "one\ntwo\n").unwrap();

        let sink = file_sink(dir.path(), r#", "maxlines": 3"#);
        assert_eq!(sink.line_count(), 2);
        assert_eq!(sink.byte_count(), 8);

        sink.write_msg(&record("three")).unwrap();
        assert_eq!(sink.rotation_count(), 0);
        sink.write_msg(&record("four")).unwrap();
        assert_eq!(sink.rotation_count(), 1);
        sink.destroy();

        assert_eq!(active_lines(dir.path()).len(), 1);
    }

    #[test]
    fn test_rotation_on_size() {
        let dir = tempfile::tempdir().unwrap();
        let sink = file_sink(dir.path(), r#", "maxsize": 1"#);
        let big = "x".repeat(600 * 1024);

        sink.write_msg(&record(&big)).unwrap();
        assert_eq!(sink.rotation_count(), 0);
        sink.write_msg(&record(&big)).unwrap();
        assert_eq!(sink.rotation_count(), 1);
        sink.destroy();
        assert_eq!(rotated(dir.path()).len(), 1);
    }

    #[test]
    fn test_daily_rotation_uses_record_day() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = FileSink::new();
        sink.init(&format!(
            r#"{{ "filename": {} }}"#,
            serde_json::to_string(&path.to_string_lossy()).unwrap()
        ))
        .unwrap();

        sink.write_msg(&record("today")).unwrap();
        assert_eq!(sink.rotation_count(), 0);

        let tomorrow = Local::now() + ChronoDuration::days(1);
        sink.write_msg(&LogRecord::new(LogLevel::Info, "[INFO] tomorrow", tomorrow))
            .unwrap();
        assert_eq!(sink.rotation_count(), 1);
        sink.destroy();

        let names = rotated(dir.path());
        let stamp = tomorrow.format("%Y-%m-%d").to_string();
        assert!(names.iter().all(|n| n.contains(&stamp)), "{names:?}");
    }

    #[test]
    fn test_late_record_across_midnight_rotates_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut sink = FileSink::new();
        sink.init(&format!(
            r#"{{ "filename": {} }}"#,
            serde_json::to_string(&path.to_string_lossy()).unwrap()
        ))
        .unwrap();

        let today = Local::now();
        let tomorrow = today + ChronoDuration::days(1);
        sink.write_msg(&LogRecord::new(LogLevel::Info, "[INFO] next day", tomorrow))
            .unwrap();
        sink.write_msg(&LogRecord::new(LogLevel::Info, "[INFO] late", today))
            .unwrap();
        sink.write_msg(&LogRecord::new(LogLevel::Info, "[INFO] next day again", tomorrow))
            .unwrap();
        assert_eq!(sink.rotation_count(), 1);
        sink.destroy();

        let lines = active_lines(dir.path());
        assert_eq!(lines.len(), 3);
        assert!(lines[1].ends_with("late"));
    }

    #[test]
    fn test_rotate_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let sink = file_sink(dir.path(), r#", "maxlines": 1, "rotate": false"#);
        for i in 0..5 {
            sink.write_msg(&record(&i.to_string())).unwrap();
        }
        sink.destroy();
        assert_eq!(sink.rotation_count(), 0);
        assert_eq!(active_lines(dir.path()).len(), 5);
    }

    #[test]
    fn test_concurrent_crossing_rotates_once() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(file_sink(dir.path(), r#", "maxlines": 100"#));
        for i in 0..100 {
            sink.write_msg(&record(&format!("warm {i}"))).unwrap();
        }

        // every racer sees the threshold crossed before taking the lock
        let writers: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || sink.write_msg(&record(&format!("racer {i}"))).unwrap())
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        sink.destroy();

        assert_eq!(sink.rotation_count(), 1);
        assert_eq!(rotated(dir.path()).len(), 1);
        assert_eq!(active_lines(dir.path()).len(), 8);
    }

    #[test]
    fn test_concurrent_size_crossing_rotates_once() {
        let dir = tempfile::tempdir().unwrap();
        // 10 bytes short of the 1 MB limit, so every racer's line crosses it
        fs::write(dir.path().join("app.log"), vec![b'x'; config::MB as usize - 10]).unwrap();
        let sink = Arc::new(file_sink(dir.path(), r#", "maxsize": 1"#));
        assert_eq!(sink.byte_count(), config::MB - 10);

        let writers: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || sink.write_msg(&record(&format!("racer {i}"))).unwrap())
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        sink.destroy();

        assert_eq!(sink.rotation_count(), 1);
        assert_eq!(rotated(dir.path()).len(), 1);
        assert_eq!(active_lines(dir.path()).len(), 8);
    }

    #[test]
    fn test_rotated_files_get_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let sink = file_sink(dir.path(), r#", "maxlines": 2"#);
        for i in 0..4 {
            sink.write_msg(&record(&format!("line {i}"))).unwrap();
        }
        sink.destroy();

        let zipped: Vec<PathBuf> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "zip"))
            .collect();
        assert_eq!(zipped.len(), 1);
        assert_eq!(rotated(dir.path()).len(), 1);

        let mut text = String::new();
        flate2::read::GzDecoder::new(File::open(&zipped[0]).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("line 0"));
    }

    #[test]
    fn test_flush_and_write_after_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let sink = file_sink(dir.path(), "");
        sink.write_msg(&record("a")).unwrap();
        sink.flush().unwrap();
        sink.destroy();
        assert!(sink.flush().is_ok());
        assert!(matches!(
            sink.write_msg(&record("b")).unwrap_err(),
            ContractError::Io(_)
        ));
    }
}
