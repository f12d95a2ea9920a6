//! Test utilities for db-backup-manager
//!
//! This crate provides shared test utilities, re-exported mock pipeline
//! steps, and helpers for testing the db-backup-manager application.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use test_utils::{ConfigBuilder, MockDumpOps, TestContext};
//!
//! #[test]
//! fn my_test() {
//!     let ctx = TestContext::from_builder(ConfigBuilder::minimal());
//!     let manager = ctx.manager_with(MockDumpOps::new());
//!     // ... test code
//! }
//! ```

pub mod config_builder;
pub mod fixtures;
pub mod recorder;
pub mod test_context;

// Re-export commonly used items
pub use config_builder::ConfigBuilder;
pub use fixtures::*;
pub use recorder::{EventLog, Recorded};
pub use test_context::{ResultAssertions, TestContext};

// Re-export types from the main crate for convenience
pub use db_backup_manager::config::{
    ArchiveFormat, Config, ConfigError, DumpConfig, GlobalConfig, TargetConfig, TargetDescriptor,
};
pub use db_backup_manager::managers::outcome::{OutcomeRecord, OutcomeStatus, PassSummary, TargetStage};
pub use db_backup_manager::utils::{ArchiveLayout, FsArchiver, FsRetention};

// Re-export mock implementations from the main crate
pub use db_backup_manager::managers::outcome::mock::MemorySink;
pub use db_backup_manager::managers::outcome::OutcomeSink;
pub use db_backup_manager::utils::archive::mock::MockArchiveOps;
pub use db_backup_manager::utils::archive::ArchiveOperations;
pub use db_backup_manager::utils::dump::mock::{MockDumpFailure, MockDumpOps};
pub use db_backup_manager::utils::dump::DumpOperations;
pub use db_backup_manager::utils::retention::mock::MockRetentionOps;
pub use db_backup_manager::utils::retention::RetentionOperations;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
