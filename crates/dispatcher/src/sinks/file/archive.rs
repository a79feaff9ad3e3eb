//! Compression of rotated files and retention pruning

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use contracts::ContractError;
use flate2::{Compression, GzBuilder};
use tracing::{debug, error, info};

use super::config::RetentionPolicy;
use super::naming::{self, RotatedKind};

const SECS_PER_DAY: u64 = 86_400;

/// Everything the janitor needs to process one sink's directory
#[derive(Debug, Clone)]
pub struct ArchivePlan {
    pub dir: PathBuf,
    pub base_name: String,
    /// Active file, never compressed or pruned
    pub active: PathBuf,
    pub retention: RetentionPolicy,
}

/// Gzip `source` into `target`, removing `source` only after success
///
/// The gzip header carries the rotated `.log` file name, so
/// `gunzip -N` restores it.
pub fn compress_file(source: &Path, target: &Path) -> Result<(), ContractError> {
    let result = write_gzip(source, target);
    if let Err(e) = result {
        // a partial archive would shadow the pending log on the next sweep
        let _ = fs::remove_file(target);
        return Err(ContractError::compression(source, e));
    }
    fs::remove_file(source).map_err(|e| ContractError::compression(source, e))
}

fn write_gzip(source: &Path, target: &Path) -> io::Result<()> {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut reader = File::open(source)?;
    let writer = File::create(target)?;
    let mut encoder = GzBuilder::new()
        .filename(name.as_bytes())
        .write(writer, Compression::default());
    io::copy(&mut reader, &mut encoder)?;
    let file = encoder.finish()?;
    file.sync_all()
}

/// Outcome of one retention pass
#[derive(Debug, Default)]
pub struct RetentionReport {
    pub deleted: Vec<PathBuf>,
    pub errors: Vec<ContractError>,
}

struct Candidate {
    path: PathBuf,
    modified: SystemTime,
    size: u64,
}

/// Delete files of this sink that are too old, then the oldest files until
/// the total fits the size budget
///
/// Files are matched by the `<base>.` prefix in the sink's directory, not
/// recursively, and the active file is skipped. Per-file failures are
/// collected and do not stop the pass.
pub fn enforce_retention(plan: &ArchivePlan, now: SystemTime) -> RetentionReport {
    let mut report = RetentionReport::default();
    let entries = match fs::read_dir(&plan.dir) {
        Ok(entries) => entries,
        Err(e) => {
            report.errors.push(ContractError::retention(&plan.dir, e));
            return report;
        }
    };

    let prefix = format!("{}.", plan.base_name);
    let active_name = plan.active.file_name();
    let max_age = (plan.retention.max_days > 0)
        .then(|| Duration::from_secs(plan.retention.max_days.saturating_mul(SECS_PER_DAY)));

    let mut candidates = Vec::new();
    let mut total: u64 = 0;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                report.errors.push(ContractError::retention(&plan.dir, e));
                continue;
            }
        };
        let path = entry.path();
        let file_name = entry.file_name();
        if Some(file_name.as_os_str()) == active_name {
            continue;
        }
        if !file_name.to_string_lossy().starts_with(&prefix) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            Ok(_) => continue,
            Err(e) => {
                report.errors.push(ContractError::retention(&path, e));
                continue;
            }
        };
        let modified = match metadata.modified() {
            Ok(t) => t,
            Err(e) => {
                report.errors.push(ContractError::retention(&path, e));
                continue;
            }
        };

        let expired = max_age.is_some_and(|age| {
            now.duration_since(modified)
                .is_ok_and(|elapsed| elapsed > age)
        });
        if expired {
            remove(&path, &mut report);
            continue;
        }

        total = total.saturating_add(metadata.len());
        candidates.push(Candidate {
            path,
            modified,
            size: metadata.len(),
        });
    }

    let budget = plan.retention.max_total_bytes;
    if budget == 0 || total <= budget {
        return report;
    }

    candidates.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)));
    let excess = total - budget;
    let mut freed: u64 = 0;
    for candidate in candidates {
        if freed > excess {
            break;
        }
        if remove(&candidate.path, &mut report) {
            freed = freed.saturating_add(candidate.size);
        }
    }

    report
}

fn remove(path: &Path, report: &mut RetentionReport) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            report.deleted.push(path.to_path_buf());
            true
        }
        Err(e) => {
            report.errors.push(ContractError::retention(path, e));
            false
        }
    }
}

/// Rotated `.log` files of this sink still waiting for compression
pub fn pending_logs(plan: &ArchivePlan) -> io::Result<Vec<PathBuf>> {
    let mut pending: Vec<PathBuf> = fs::read_dir(&plan.dir)?
        .filter_map(Result::ok)
        .filter(|entry| {
            naming::parse_rotated(&plan.base_name, &entry.file_name().to_string_lossy())
                == Some(RotatedKind::Pending)
        })
        .map(|entry| entry.path())
        .collect();
    pending.sort();
    Ok(pending)
}

/// One janitor pass: compress every pending rotated file, then prune
pub fn sweep(plan: &ArchivePlan) {
    match pending_logs(plan) {
        Ok(pending) => {
            for source in pending {
                let target = naming::archive_path_for(&source);
                match compress_file(&source, &target) {
                    Ok(()) => debug!(file = %target.display(), "Rotated log compressed"),
                    Err(e) => error!(error = %e, "Rotated log compression failed"),
                }
            }
        }
        Err(e) => error!(dir = %plan.dir.display(), error = %e, "Unable to list rotated logs"),
    }

    let report = enforce_retention(plan, SystemTime::now());
    for path in &report.deleted {
        info!(file = %path.display(), "Old log removed");
    }
    for e in &report.errors {
        error!(error = %e, "Retention cleanup failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn plan(dir: &Path, max_days: u64, max_total_bytes: u64) -> ArchivePlan {
        ArchivePlan {
            dir: dir.to_path_buf(),
            base_name: "app".to_string(),
            active: dir.join("app.log"),
            retention: RetentionPolicy {
                max_days,
                max_total_bytes,
            },
        }
    }

    fn write_aged(path: &Path, size: usize, modified: SystemTime) {
        fs::write(path, vec![b'x'; size]).unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    #[test]
    fn test_compress_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("app.2024-03-09-08-05-03.log");
        let target = naming::archive_path_for(&source);
        let content = "[2024-03-09 08:05:03.000001][INFO] hello\n".repeat(50);
        fs::write(&source, &content).unwrap();

        compress_file(&source, &target).unwrap();
        assert!(!source.exists());

        let mut decoder = GzDecoder::new(File::open(&target).unwrap());
        let mut restored = String::new();
        decoder.read_to_string(&mut restored).unwrap();
        assert_eq!(restored, content);
        let header = decoder.header().unwrap();
        assert_eq!(header.filename(), Some("app.2024-03-09-08-05-03.log".as_bytes()));
    }

    #[test]
    fn test_compress_missing_source_keeps_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("app.2024-03-09-08-05-03.log");
        let target = naming::archive_path_for(&source);
        let err = compress_file(&source, &target).unwrap_err();
        assert!(matches!(err, ContractError::Compression { .. }));
        assert!(!target.exists());
    }

    #[test]
    fn test_age_rule_applies_under_size_budget() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        let old = dir.path().join("app.2024-01-01-00-00-00.zip");
        let fresh = dir.path().join("app.2024-01-09-00-00-00.zip");
        let other = dir.path().join("other.2024-01-01-00-00-00.zip");
        write_aged(&old, 10, now - Duration::from_secs(8 * SECS_PER_DAY));
        write_aged(&fresh, 10, now - Duration::from_secs(SECS_PER_DAY));
        write_aged(&other, 10, now - Duration::from_secs(30 * SECS_PER_DAY));
        write_aged(&dir.path().join("app.log"), 10, now - Duration::from_secs(30 * SECS_PER_DAY));

        let report = enforce_retention(&plan(dir.path(), 7, 1_000_000), now);
        assert_eq!(report.deleted, vec![old.clone()]);
        assert!(report.errors.is_empty());
        assert!(fresh.exists());
        assert!(other.exists());
        assert!(dir.path().join("app.log").exists());
    }

    #[test]
    fn test_size_rule_deletes_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        let a = dir.path().join("app.2024-01-01-00-00-00.zip");
        let b = dir.path().join("app.2024-01-02-00-00-00.zip");
        let c = dir.path().join("app.2024-01-03-00-00-00.zip");
        write_aged(&a, 5_000, now - Duration::from_secs(300));
        write_aged(&b, 7_000, now - Duration::from_secs(200));
        write_aged(&c, 3_000, now - Duration::from_secs(100));

        let report = enforce_retention(&plan(dir.path(), 0, 10_000), now);
        assert_eq!(report.deleted, vec![a.clone(), b.clone()]);
        assert!(!a.exists());
        assert!(!b.exists());
        assert!(c.exists());
    }

    #[test]
    fn test_within_budget_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        write_aged(&dir.path().join("app.2024-01-01-00-00-00.zip"), 100, now);
        write_aged(&dir.path().join("app.2024-01-02-00-00-00.zip"), 100, now);

        let report = enforce_retention(&plan(dir.path(), 7, 1_000), now);
        assert!(report.deleted.is_empty());

        let report = enforce_retention(&plan(dir.path(), 0, 0), now);
        assert!(report.deleted.is_empty());
    }

    #[test]
    fn test_missing_dir_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let report = enforce_retention(&plan(&dir.path().join("gone"), 7, 10), SystemTime::now());
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_sweep_compresses_pending_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.log"), "active\n").unwrap();
        fs::write(dir.path().join("app.2024-03-09-08-05-03.log"), "one\n").unwrap();
        fs::write(dir.path().join("app.2024-03-09-08-05-03.1.log"), "two\n").unwrap();
        fs::write(dir.path().join("app.notes.log"), "keep\n").unwrap();

        sweep(&plan(dir.path(), 0, 0));

        assert!(dir.path().join("app.log").exists());
        assert!(dir.path().join("app.notes.log").exists());
        assert!(dir.path().join("app.2024-03-09-08-05-03.zip").exists());
        assert!(dir.path().join("app.2024-03-09-08-05-03.1.zip").exists());
        assert!(!dir.path().join("app.2024-03-09-08-05-03.log").exists());
        assert!(!dir.path().join("app.2024-03-09-08-05-03.1.log").exists());
    }
}
