//! Retention enforcer: keeps at most `max_backups` archives per target

use super::layout::ArchiveLayout;
use crate::config::TargetDescriptor;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// A deletion that did not go through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of one enforcement run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionReport {
    /// Archives left on disk
    pub remaining: usize,
    pub deleted: Vec<PathBuf>,
    pub failures: Vec<DeletionFailure>,
}

impl RetentionReport {
    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    /// True when every surplus archive was removed
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetentionError {
    #[error("Failed to list archives in {path:?}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Abstraction over retention enforcement, enabling mocking in tests
pub trait RetentionOperations: Send + Sync {
    /// Delete the oldest archives of `target` beyond its `max_backups`
    fn enforce(&self, target: &TargetDescriptor) -> Result<RetentionReport, RetentionError>;
}

type RemoveFn = Box<dyn Fn(&Path) -> io::Result<()> + Send + Sync>;

/// Retention over the archive directory layout
pub struct FsRetention {
    layout: ArchiveLayout,
    remove: RemoveFn,
}

impl FsRetention {
    pub fn new(layout: ArchiveLayout) -> Self {
        Self::with_remover(layout, |path| fs::remove_file(path))
    }

    /// Use a custom deletion function (tests inject failures through this)
    pub fn with_remover<F>(layout: ArchiveLayout, remove: F) -> Self
    where
        F: Fn(&Path) -> io::Result<()> + Send + Sync + 'static,
    {
        Self {
            layout,
            remove: Box::new(remove),
        }
    }
}

impl RetentionOperations for FsRetention {
    fn enforce(&self, target: &TargetDescriptor) -> Result<RetentionReport, RetentionError> {
        let archives = self
            .layout
            .list_archives(&target.name)
            .map_err(|source| RetentionError::List {
                path: self.layout.target_dir(&target.name),
                source,
            })?;

        let limit = target.max_backups as usize;
        let mut report = RetentionReport {
            remaining: archives.len(),
            ..Default::default()
        };

        if archives.len() <= limit {
            debug!(
                "No old backups to delete for '{}' ({} of {})",
                target.name,
                archives.len(),
                limit
            );
            return Ok(report);
        }

        let surplus = archives.len() - limit;
        info!(
            "Target '{}' has {} archives, deleting {} oldest",
            target.name,
            archives.len(),
            surplus
        );

        for archive in archives.iter().take(surplus) {
            match (self.remove)(&archive.path) {
                Ok(()) => {
                    info!("Deleted old backup: {:?}", archive.path);
                    report.deleted.push(archive.path.clone());
                }
                Err(e) => {
                    error!("Failed to delete old backup {:?}: {}", archive.path, e);
                    report.failures.push(DeletionFailure {
                        path: archive.path.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.remaining = archives.len() - report.deleted.len();
        Ok(report)
    }
}

/// Mock implementation for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Mock retention that records calls and returns configured reports
    #[derive(Clone, Default)]
    pub struct MockRetentionOps {
        /// Target names in the order retention ran
        pub calls: Arc<Mutex<Vec<String>>>,
        /// Reports to return by target name (default: clean, nothing deleted)
        reports: Arc<Mutex<HashMap<String, RetentionReport>>>,
        /// Targets whose listing fails
        failing: Arc<Mutex<Vec<String>>>,
    }

    impl MockRetentionOps {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure the report returned for `target`
        pub fn with_report(self, target: &str, report: RetentionReport) -> Self {
            self.reports
                .lock()
                .unwrap()
                .insert(target.to_string(), report);
            self
        }

        /// Configure one failed deletion for `target`
        pub fn with_failed_deletion(self, target: &str, path: &str, reason: &str) -> Self {
            let report = RetentionReport {
                remaining: 2,
                deleted: vec![],
                failures: vec![DeletionFailure {
                    path: PathBuf::from(path),
                    reason: reason.to_string(),
                }],
            };
            self.with_report(target, report)
        }

        /// Configure listing for `target` to fail
        pub fn with_failing_listing(self, target: &str) -> Self {
            self.failing.lock().unwrap().push(target.to_string());
            self
        }

        /// Get target names in call order
        pub fn get_calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        /// Check if retention ran for a target
        pub fn was_enforced(&self, target: &str) -> bool {
            self.calls.lock().unwrap().iter().any(|c| c == target)
        }
    }

    impl RetentionOperations for MockRetentionOps {
        fn enforce(&self, target: &TargetDescriptor) -> Result<RetentionReport, RetentionError> {
            self.calls.lock().unwrap().push(target.name.clone());

            if self.failing.lock().unwrap().contains(&target.name) {
                return Err(RetentionError::List {
                    path: PathBuf::from(&target.name),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "Mock listing failure"),
                });
            }

            Ok(self
                .reports
                .lock()
                .unwrap()
                .get(&target.name)
                .cloned()
                .unwrap_or_default())
        }
    }
}
