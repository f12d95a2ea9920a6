//! Test context and harness for pipeline tests
//!
//! Provides a unified context for setting up a backup root and building a
//! `BackupManager` wired to mocks or to the real filesystem steps.

use crate::config_builder::ConfigBuilder;
use anyhow::Result;
use db_backup_manager::config::{resolve_all_targets, Config, TargetDescriptor};
use db_backup_manager::managers::outcome::mock::MemorySink;
use db_backup_manager::utils::{
    ArchiveLayout, ArchiveOperations, DumpOperations, FsArchiver, FsRetention, RetentionOperations,
};
use db_backup_manager::BackupManager;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test context that manages test resources and provides common utilities
pub struct TestContext {
    /// Temporary directory for test files
    temp_dir: TempDir,
    config: Config,
    /// Receives every record from managers built by this context
    sink: MemorySink,
}

impl TestContext {
    /// Create a test context from a ConfigBuilder
    pub fn from_builder(builder: ConfigBuilder) -> Self {
        let (config, temp_dir) = builder.persist();

        Self {
            temp_dir,
            config,
            sink: MemorySink::new(),
        }
    }

    /// Get the temporary directory path
    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sink(&self) -> &MemorySink {
        &self.sink
    }

    /// Layout of the configured backup root
    pub fn layout(&self) -> ArchiveLayout {
        ArchiveLayout::new(
            self.config.global.backup_directory.clone(),
            self.config.global.compression,
        )
    }

    /// Resolve the configured targets
    pub fn targets(&self) -> Result<Vec<TargetDescriptor>> {
        Ok(resolve_all_targets(&self.config, false)?)
    }

    /// Manager with the given dump step and the real archiver and retention
    pub fn manager_with<D: DumpOperations + 'static>(&self, dumper: D) -> BackupManager {
        let layout = self.layout();
        self.manager_with_steps(
            dumper,
            FsArchiver::new(layout.clone()),
            FsRetention::new(layout),
        )
    }

    /// Manager with every pipeline step supplied
    pub fn manager_with_steps<D, A, R>(&self, dumper: D, archiver: A, retention: R) -> BackupManager
    where
        D: DumpOperations + 'static,
        A: ArchiveOperations + 'static,
        R: RetentionOperations + 'static,
    {
        BackupManager::with_operations(
            self.layout(),
            Box::new(dumper),
            Box::new(archiver),
            Box::new(retention),
            Box::new(self.sink.clone()),
        )
    }

    /// Create a file in the temp dir
    pub fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Serialize the config to `config.toml` in the temp dir
    pub fn write_config(&self) -> PathBuf {
        let toml_str = toml::to_string_pretty(&self.config).expect("Failed to serialize config");
        self.create_file("config.toml", &toml_str)
    }
}

/// Extension trait for assertion helpers
pub trait ResultAssertions<T> {
    /// Assert that the result is Ok and return the value
    fn assert_ok(self) -> T;

    /// Assert that the result is Err and the error message contains the given string
    fn assert_err_contains(self, needle: &str);
}

impl<T: std::fmt::Debug, E: std::fmt::Display> ResultAssertions<T> for Result<T, E> {
    fn assert_ok(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {}", e),
        }
    }

    fn assert_err_contains(self, needle: &str) {
        match self {
            Ok(v) => panic!("Expected Err containing '{}', got Ok: {:?}", needle, v),
            Err(e) => {
                let err_msg = e.to_string();
                assert!(
                    err_msg.contains(needle),
                    "Error '{}' does not contain '{}'",
                    err_msg,
                    needle
                );
            }
        }
    }
}
