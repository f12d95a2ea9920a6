//! Wrappers that log every pipeline call into one shared, ordered event log
//!
//! Used to check that targets go through dump → archive → retention
//! strictly one after another.

use chrono::NaiveDateTime;
use db_backup_manager::config::TargetDescriptor;
use db_backup_manager::utils::{
    ArchiveError, ArchiveFile, ArchiveOperations, DumpArtifact, DumpOperations, DumpResult,
    RetentionError, RetentionOperations, RetentionReport,
};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Shared, ordered list of `step:target` events
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, step: &str, target: &str) {
        self.events.lock().push(format!("{}:{}", step, target));
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

/// A pipeline step that reports each call to an `EventLog` before delegating
pub struct Recorded<T> {
    inner: T,
    log: EventLog,
}

impl<T> Recorded<T> {
    pub fn new(inner: T, log: &EventLog) -> Self {
        Self {
            inner,
            log: log.clone(),
        }
    }
}

impl<T: DumpOperations> DumpOperations for Recorded<T> {
    fn dump(&self, target: &TargetDescriptor, destination: &Path) -> DumpResult {
        self.log.push("dump", &target.name);
        self.inner.dump(target, destination)
    }

    fn check_tool(&self) -> anyhow::Result<String> {
        self.inner.check_tool()
    }
}

impl<T: ArchiveOperations> ArchiveOperations for Recorded<T> {
    fn archive(
        &self,
        target: &TargetDescriptor,
        artifact: &DumpArtifact,
        timestamp: NaiveDateTime,
    ) -> Result<ArchiveFile, ArchiveError> {
        self.log.push("archive", &target.name);
        self.inner.archive(target, artifact, timestamp)
    }
}

impl<T: RetentionOperations> RetentionOperations for Recorded<T> {
    fn enforce(&self, target: &TargetDescriptor) -> Result<RetentionReport, RetentionError> {
        self.log.push("retention", &target.name);
        self.inner.enforce(target)
    }
}
