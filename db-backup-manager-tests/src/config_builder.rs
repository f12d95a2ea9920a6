//! Fluent API for building test configurations
//!
//! Provides a builder pattern for creating test configurations with sensible defaults.

use db_backup_manager::config::{ArchiveFormat, Config, DumpConfig, GlobalConfig, TargetConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Builder for creating test configurations
pub struct ConfigBuilder {
    temp_dir: TempDir,
    global: GlobalConfig,
    dump: DumpConfig,
    targets: Vec<TargetConfig>,
}

impl ConfigBuilder {
    /// Create a new ConfigBuilder with no targets
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let backup_directory = temp_dir.path().join("backups");
        fs::create_dir_all(&backup_directory).expect("Failed to create backup dir");

        let log_directory = temp_dir.path().join("logs");
        fs::create_dir_all(&log_directory).expect("Failed to create log_directory");

        let global = GlobalConfig {
            backup_directory,
            log_directory,
            log_level: "debug".to_string(),
            log_max_files: 5,
            ..Default::default()
        };

        Self {
            temp_dir,
            global,
            dump: DumpConfig {
                timeout_seconds: 30,
                ..Default::default()
            },
            targets: Vec::new(),
        }
    }

    /// Create a minimal config with one target
    pub fn minimal() -> Self {
        Self::new().add_target("test_db")
    }

    /// Set the archive format
    pub fn with_compression(mut self, format: ArchiveFormat) -> Self {
        self.global.compression = format;
        self
    }

    /// Set the retention used by targets without their own
    pub fn with_default_max_backups(mut self, max_backups: u32) -> Self {
        self.global.default_max_backups = max_backups;
        self
    }

    /// Use a different dump program (e.g. a scripted fake)
    pub fn with_dump_program(mut self, program: &Path) -> Self {
        self.dump.program = program.display().to_string();
        self
    }

    /// Set the dump deadline
    pub fn with_dump_timeout(mut self, seconds: u64) -> Self {
        self.dump.timeout_seconds = seconds;
        self
    }

    /// Add a target with default retention
    pub fn add_target(mut self, name: &str) -> Self {
        self.targets.push(TargetConfig {
            name: name.to_string(),
            user: "backup".to_string(),
            password: Some("test-password-123".to_string()),
            database: name.to_string(),
            ..Default::default()
        });
        self
    }

    /// Add a target that keeps `max_backups` archives
    pub fn add_target_with_retention(mut self, name: &str, max_backups: u32) -> Self {
        self = self.add_target(name);
        if let Some(target) = self.targets.last_mut() {
            target.max_backups = Some(max_backups);
        }
        self
    }

    /// Add a target with full configuration
    pub fn add_target_config(mut self, target: TargetConfig) -> Self {
        self.targets.push(target);
        self
    }

    /// Get the temp directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Get the backup root
    pub fn backup_dir(&self) -> PathBuf {
        self.global.backup_directory.clone()
    }

    /// Build the Config
    pub fn build(self) -> Config {
        self.persist().0
    }

    /// Keep the temp directory (don't delete on drop)
    pub fn persist(self) -> (Config, TempDir) {
        let config = Config {
            global: self.global,
            dump: self.dump,
            targets: self.targets,
        };
        (config, self.temp_dir)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
