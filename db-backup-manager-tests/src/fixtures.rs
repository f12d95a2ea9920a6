//! Test fixtures and sample data
//!
//! Provides pre-built targets, seeded archive directories and a scripted
//! stand-in for the dump tool.

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use db_backup_manager::config::TargetDescriptor;
use db_backup_manager::utils::ArchiveLayout;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Create a resolved target for testing
pub fn sample_target(name: &str, max_backups: u32) -> TargetDescriptor {
    TargetDescriptor {
        name: name.to_string(),
        host: "localhost".to_string(),
        port: None,
        user: "backup".to_string(),
        password: "test-password-123".to_string(),
        database: name.to_string(),
        max_backups,
    }
}

/// Timestamp of the n-th seeded archive (n starts at 0)
pub fn seeded_timestamp(n: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(3, 0, 0))
        .expect("valid date")
        + ChronoDuration::days(n as i64)
}

/// Create `count` archives for `target`, oldest first.
///
/// Modification times lie in the past and increase with the index, so any
/// archive created now is newer than all of them.
pub fn seed_archives(layout: &ArchiveLayout, target: &str, count: u32) -> Vec<PathBuf> {
    fs::create_dir_all(layout.target_dir(target)).expect("Failed to create target dir");
    let base = SystemTime::now() - Duration::from_secs(30 * 86_400);

    (0..count)
        .map(|n| {
            let path = layout.archive_path(target, &seeded_timestamp(n));
            fs::write(&path, format!("seeded archive {}", n)).expect("Failed to seed archive");
            File::options()
                .write(true)
                .open(&path)
                .and_then(|f| f.set_modified(base + Duration::from_secs(n as u64 * 3600)))
                .expect("Failed to set mtime");
            path
        })
        .collect()
}

/// File names in a target's archive directory, sorted
pub fn archive_names(layout: &ArchiveLayout, target: &str) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(layout.target_dir(target)) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// Write an executable shell script that behaves like the dump tool.
///
/// The database is the last argument. Databases listed in `failing` make
/// the script print an error and exit 2; others get a small SQL dump.
#[cfg(unix)]
pub fn write_fake_dump_tool(dir: &Path, failing: &[&str]) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let cases: String = failing
        .iter()
        .map(|db| {
            format!(
                "  {db}) echo \"mysqldump: Got error: 1049: Unknown database '{db}'\" >&2; exit 2 ;;\n"
            )
        })
        .collect();

    let script = format!(
        r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "mysqldump  Ver 8.0.36 (fake)"
  exit 0
fi
for arg; do db="$arg"; done
case "$db" in
{cases}esac
echo "-- MySQL dump of $db"
echo "CREATE TABLE t (id INT);"
echo "INSERT INTO t VALUES (1),(2),(3);"
"#
    );

    let path = dir.join("fake-mysqldump");
    fs::write(&path, script).expect("Failed to write fake dump tool");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("Failed to make fake dump tool executable");
    path
}

/// Minimal valid config TOML; `{backup_dir}` and `{log_dir}` are placeholders
pub fn minimal_config_toml() -> &'static str {
    r#"
[global]
backup_directory = "{backup_dir}"
log_directory = "{log_dir}"

[[targets]]
name = "test_db"
user = "backup"
password = "secret"
database = "test_db"
"#
}

/// Config TOML with an invalid retention value
pub fn invalid_retention_toml() -> &'static str {
    r#"
[[targets]]
name = "test_db"
user = "backup"
password = "secret"
database = "test_db"
max_backups = 0
"#
}

/// Config TOML declaring the same target twice
pub fn duplicate_target_toml() -> &'static str {
    r#"
[[targets]]
name = "shop"
user = "backup"
password = "secret"
database = "shop"

[[targets]]
name = "shop"
user = "backup"
password = "secret"
database = "shop_copy"
"#
}
