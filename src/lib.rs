//! DB Backup Manager Library
//!
//! Sequential database backup passes: dump each target with an external
//! tool, compress the dump into a timestamped archive, and keep only the
//! newest archives per target.

pub mod config;
pub mod managers;
pub mod utils;

// Re-export commonly used types
pub use config::{load_config, resolve_all_targets, Config, TargetDescriptor};
pub use managers::backup::BackupManager;
pub use managers::logging::{init_console_logging, init_logging, LogGuard, LoggingConfig, Verbosity};
pub use managers::outcome::{LogSink, OutcomeRecord, OutcomeSink, OutcomeStatus, PassSummary, TargetStage};
