//! Backup manager - orchestrates one backup pass over all targets
//!
//! Targets are processed strictly one after another:
//! dump → archive → retention. A failing target is recorded and the pass
//! moves on; only an invalid target list stops the pass, and it does so
//! before any target is touched.

use crate::config::{expand_tilde, validate_targets, Config, ConfigError, TargetDescriptor};
use crate::managers::outcome::{LogSink, OutcomeRecord, OutcomeSink, PassSummary, TargetStage};
use crate::utils::{
    ArchiveLayout, ArchiveOperations, CommandDumper, DumpOperations, FsArchiver, FsRetention,
    RetentionError, RetentionOperations, RetentionReport,
};
use chrono::{NaiveDateTime, SubsecRound, Utc};
use std::time::Instant;
use tracing::{debug, error, info, warn};

pub struct BackupManager {
    layout: ArchiveLayout,
    dumper: Box<dyn DumpOperations>,
    archiver: Box<dyn ArchiveOperations>,
    retention: Box<dyn RetentionOperations>,
    sink: Box<dyn OutcomeSink>,
}

impl BackupManager {
    /// Create backup manager backed by the real dump tool and filesystem
    pub fn new(config: &Config) -> Self {
        let layout = ArchiveLayout::new(
            expand_tilde(&config.global.backup_directory),
            config.global.compression,
        );

        Self::with_operations(
            layout.clone(),
            Box::new(CommandDumper::new(config.dump.clone())),
            Box::new(FsArchiver::new(layout.clone())),
            Box::new(FsRetention::new(layout)),
            Box::new(LogSink::new()),
        )
    }

    /// Create backup manager with specific pipeline steps and sink
    pub fn with_operations(
        layout: ArchiveLayout,
        dumper: Box<dyn DumpOperations>,
        archiver: Box<dyn ArchiveOperations>,
        retention: Box<dyn RetentionOperations>,
        sink: Box<dyn OutcomeSink>,
    ) -> Self {
        Self {
            layout,
            dumper,
            archiver,
            retention,
            sink,
        }
    }

    pub fn layout(&self) -> &ArchiveLayout {
        &self.layout
    }

    /// Check that the dump tool can be executed
    pub fn check_tool(&self) -> anyhow::Result<String> {
        self.dumper.check_tool()
    }

    /// Run one pass over `targets`, in order.
    ///
    /// Emits one outcome record per target and a summary to the sink.
    /// Returns an error only when the target list itself is invalid.
    pub fn run_pass(&self, targets: &[TargetDescriptor]) -> Result<PassSummary, ConfigError> {
        validate_targets(targets)?;

        info!("Starting backup pass for {} target(s)", targets.len());
        let start_time = Instant::now();
        let mut records = Vec::with_capacity(targets.len());

        for (index, target) in targets.iter().enumerate() {
            info!(
                "Processing target {}/{}: {}",
                index + 1,
                targets.len(),
                target.name
            );

            let record = self.backup_target(target);
            self.sink.record(&record);
            records.push(record);
        }

        let summary = PassSummary::from_records(records, start_time.elapsed());
        self.sink.summary(&summary);

        info!(
            "Backup pass completed in {:.2}s: {} succeeded, {} failed",
            start_time.elapsed().as_secs_f64(),
            summary.succeeded,
            summary.failed
        );

        Ok(summary)
    }

    /// Run only the retention step for each target
    pub fn prune(
        &self,
        targets: &[TargetDescriptor],
    ) -> Result<Vec<(String, Result<RetentionReport, RetentionError>)>, ConfigError> {
        validate_targets(targets)?;

        Ok(targets
            .iter()
            .map(|target| {
                info!("Checking for old backups to delete for target: {}", target.name);
                (target.name.clone(), self.retention.enforce(target))
            })
            .collect())
    }

    /// Take one target through the pipeline and describe how it went
    fn backup_target(&self, target: &TargetDescriptor) -> OutcomeRecord {
        let start_time = Instant::now();
        let timestamp = archive_timestamp();
        self.enter(target, TargetStage::Pending);

        self.enter(target, TargetStage::Dumping);
        let raw_path = self.layout.raw_dump_path(&target.name, &timestamp);
        let artifact = match self.dumper.dump(target, &raw_path) {
            Ok(artifact) => artifact,
            Err(e) => return self.failed(target, TargetStage::Dumping, e.to_string(), start_time),
        };

        self.enter(target, TargetStage::Archiving);
        let archive = match self.archiver.archive(target, &artifact, timestamp) {
            Ok(archive) => archive,
            Err(e) => return self.failed(target, TargetStage::Archiving, e.to_string(), start_time),
        };

        // Must follow the archive step directly: until it finishes the target
        // may hold one archive more than allowed.
        self.enter(target, TargetStage::EnforcingRetention);
        let (archives_deleted, warnings) = match self.retention.enforce(target) {
            Ok(report) => (report.deleted_count(), retention_warnings(&report)),
            Err(e) => {
                warn!("Retention check failed for '{}': {}", target.name, e);
                (0, vec![format!("retention check failed: {}", e)])
            }
        };

        self.enter(target, TargetStage::Done);
        OutcomeRecord::success(
            &target.name,
            archive.path,
            archive.size_bytes,
            archives_deleted,
            warnings,
            start_time.elapsed(),
        )
    }

    fn enter(&self, target: &TargetDescriptor, stage: TargetStage) {
        debug!("Target '{}': {}", target.name, stage);
    }

    fn failed(
        &self,
        target: &TargetDescriptor,
        stage: TargetStage,
        reason: String,
        start_time: Instant,
    ) -> OutcomeRecord {
        error!("Backup of '{}' failed while {}: {}", target.name, stage, reason);
        self.enter(target, TargetStage::Failed);
        OutcomeRecord::failure(&target.name, stage, reason, start_time.elapsed())
    }
}

/// Second-resolution UTC time used in archive names.
///
/// UTC never repeats an hour, so names stay increasing across DST changes.
fn archive_timestamp() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(0)
}

fn retention_warnings(report: &RetentionReport) -> Vec<String> {
    report
        .failures
        .iter()
        .map(|f| format!("could not delete old archive {:?}: {}", f.path, f.reason))
        .collect()
}
