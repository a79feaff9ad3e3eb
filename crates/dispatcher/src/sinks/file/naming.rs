//! Rotated file names
//!
//! Active `app.log` rotates to `app.<YYYY-MM-DD-HH-MM-SS>.log`, which the
//! janitor later compresses to `app.<...>.zip`. When two rotations land in
//! the same second a numeric suffix is appended: `app.<...>.1.log`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};

pub const ROTATED_TIME_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";
pub const LOG_EXT: &str = "log";
pub const ARCHIVE_EXT: &str = "zip";

/// Pick a free rotation target in `dir` for a rotation at `when`
pub fn rotated_log_path(dir: &Path, base_name: &str, when: &DateTime<Local>) -> PathBuf {
    let stamp = when.format(ROTATED_TIME_FORMAT).to_string();
    let mut seq = 0u32;
    loop {
        let stem = if seq == 0 {
            format!("{base_name}.{stamp}")
        } else {
            format!("{base_name}.{stamp}.{seq}")
        };
        let log = dir.join(format!("{stem}.{LOG_EXT}"));
        let archive = dir.join(format!("{stem}.{ARCHIVE_EXT}"));
        if !log.exists() && !archive.exists() {
            return log;
        }
        seq += 1;
    }
}

/// Archive path for a rotated `.log`
pub fn archive_path_for(rotated_log: &Path) -> PathBuf {
    rotated_log.with_extension(ARCHIVE_EXT)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotatedKind {
    /// Rotated, waiting for compression
    Pending,
    Archived,
}

/// Classify `file_name` as a rotated file of `base_name`, if it is one
pub fn parse_rotated(base_name: &str, file_name: &str) -> Option<RotatedKind> {
    let rest = file_name.strip_prefix(base_name)?.strip_prefix('.')?;
    let (middle, kind) = if let Some(m) = rest.strip_suffix(".log") {
        (m, RotatedKind::Pending)
    } else if let Some(m) = rest.strip_suffix(".zip") {
        (m, RotatedKind::Archived)
    } else {
        return None;
    };

    let stamp = match middle.split_once('.') {
        Some((stamp, seq)) if !seq.is_empty() && seq.bytes().all(|b| b.is_ascii_digit()) => stamp,
        Some(_) => return None,
        None => middle,
    };
    NaiveDateTime::parse_from_str(stamp, ROTATED_TIME_FORMAT).ok()?;
    Some(kind)
}

/// Rotated stem (name without extension), used to count rotations
pub fn rotated_stem(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name)
}
