//! On-disk layout of the backup directory
//!
//! Archives live in one subdirectory per target:
//! `{root}/{target}/{target}_{YYYYMMDD_HHMMSS}.{ext}`.

use crate::config::ArchiveFormat;
use chrono::NaiveDateTime;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Timestamp format embedded in archive names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Suffix of the raw dump written before compression
const RAW_DUMP_SUFFIX: &str = "sql.tmp";

/// An archive found on disk
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: PathBuf,
    pub file_name: String,
    pub timestamp: NaiveDateTime,
    pub modified: SystemTime,
    pub size_bytes: u64,
}

/// Naming rules and directory structure for archives
#[derive(Debug, Clone)]
pub struct ArchiveLayout {
    root: PathBuf,
    format: ArchiveFormat,
}

impl ArchiveLayout {
    pub fn new(root: impl Into<PathBuf>, format: ArchiveFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Directory holding all archives of a target
    pub fn target_dir(&self, target: &str) -> PathBuf {
        self.root.join(target)
    }

    /// `{target}_{YYYYMMDD_HHMMSS}.{ext}`
    pub fn archive_name(&self, target: &str, timestamp: &NaiveDateTime) -> String {
        format!(
            "{}_{}.{}",
            target,
            timestamp.format(TIMESTAMP_FORMAT),
            self.format.extension()
        )
    }

    pub fn archive_path(&self, target: &str, timestamp: &NaiveDateTime) -> PathBuf {
        self.target_dir(target)
            .join(self.archive_name(target, timestamp))
    }

    /// Name of the dump inside a zip container
    pub fn entry_name(&self, target: &str, timestamp: &NaiveDateTime) -> String {
        format!("{}_{}.sql", target, timestamp.format(TIMESTAMP_FORMAT))
    }

    /// Location of the uncompressed dump for one target step
    pub fn raw_dump_path(&self, target: &str, timestamp: &NaiveDateTime) -> PathBuf {
        self.target_dir(target).join(format!(
            "{}_{}.{}",
            target,
            timestamp.format(TIMESTAMP_FORMAT),
            RAW_DUMP_SUFFIX
        ))
    }

    /// Parse the timestamp out of an archive file name belonging to `target`.
    ///
    /// Only exact `{target}_{YYYYMMDD_HHMMSS}.{ext}` names match, so `db1`
    /// never claims archives of `db10`. Any container extension matches, not
    /// just the configured one: archives written before a `compression`
    /// change still count towards retention.
    pub fn parse_archive_name(&self, target: &str, file_name: &str) -> Option<NaiveDateTime> {
        let rest = file_name.strip_prefix(target)?.strip_prefix('_')?;
        let stamp = ArchiveFormat::ALL
            .iter()
            .find_map(|format| rest.strip_suffix(format.extension()))?
            .strip_suffix('.')?;

        // "YYYYMMDD_HHMMSS"
        if stamp.len() != 15 {
            return None;
        }

        NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()
    }

    /// List a target's archives, oldest first.
    ///
    /// Ordered by modification time; equal times fall back to file name order.
    /// A missing target directory yields an empty list.
    pub fn list_archives(&self, target: &str) -> io::Result<Vec<ArchiveEntry>> {
        let dir = self.target_dir(target);
        let read_dir = match fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut archives = Vec::new();
        for entry in read_dir {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().to_string();

            let Some(timestamp) = self.parse_archive_name(target, &file_name) else {
                continue;
            };

            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }

            archives.push(ArchiveEntry {
                path: entry.path(),
                file_name,
                timestamp,
                modified: metadata.modified()?,
                size_bytes: metadata.len(),
            });
        }

        archives.sort_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });

        Ok(archives)
    }
}
