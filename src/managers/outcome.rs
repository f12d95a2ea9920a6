//! Per-target outcome records and the pass summary
//!
//! The orchestrator hands every record to an injected `OutcomeSink`.
//! `LogSink` writes them as `FINAL_STATUS | ...` lines through tracing.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

/// Stage a target reached in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStage {
    Pending,
    Dumping,
    Archiving,
    EnforcingRetention,
    Done,
    Failed,
}

impl fmt::Display for TargetStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetStage::Pending => "pending",
            TargetStage::Dumping => "dumping",
            TargetStage::Archiving => "archiving",
            TargetStage::EnforcingRetention => "enforcing retention",
            TargetStage::Done => "done",
            TargetStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutcomeStatus {
    Success,
    Failure,
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeStatus::Success => f.write_str("SUCCESS"),
            OutcomeStatus::Failure => f.write_str("FAILURE"),
        }
    }
}

/// Result of processing one target in one pass
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeRecord {
    pub target: String,
    pub status: OutcomeStatus,
    /// Archive created (success only)
    pub archive: Option<PathBuf>,
    pub archive_size_bytes: Option<u64>,
    /// Failure reason (failure only)
    pub error: Option<String>,
    /// Stage at which the target failed
    pub failed_stage: Option<TargetStage>,
    /// Non-fatal problems, e.g. old archives that could not be deleted
    pub warnings: Vec<String>,
    pub archives_deleted: usize,
    pub elapsed_ms: u64,
    pub finished_at: DateTime<Local>,
}

impl OutcomeRecord {
    pub fn success(
        target: &str,
        archive: PathBuf,
        archive_size_bytes: u64,
        archives_deleted: usize,
        warnings: Vec<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            target: target.to_string(),
            status: OutcomeStatus::Success,
            archive: Some(archive),
            archive_size_bytes: Some(archive_size_bytes),
            error: None,
            failed_stage: None,
            warnings,
            archives_deleted,
            elapsed_ms: elapsed.as_millis() as u64,
            finished_at: Local::now(),
        }
    }

    pub fn failure(target: &str, stage: TargetStage, error: String, elapsed: Duration) -> Self {
        Self {
            target: target.to_string(),
            status: OutcomeStatus::Failure,
            archive: None,
            archive_size_bytes: None,
            error: Some(error),
            failed_stage: Some(stage),
            warnings: Vec::new(),
            archives_deleted: 0,
            elapsed_ms: elapsed.as_millis() as u64,
            finished_at: Local::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }

    /// Human-readable detail: the error, or a success message plus warnings
    pub fn detail(&self) -> String {
        match self.status {
            OutcomeStatus::Failure => format!(
                "Failed while {}: {}",
                self.failed_stage.unwrap_or(TargetStage::Failed),
                self.error.as_deref().unwrap_or("unknown error")
            ),
            OutcomeStatus::Success => {
                let mut detail = format!(
                    "Backup successful ({} bytes, {} old archive(s) deleted)",
                    self.archive_size_bytes.unwrap_or(0),
                    self.archives_deleted
                );
                for warning in &self.warnings {
                    detail.push_str("; warning: ");
                    detail.push_str(warning);
                }
                detail
            }
        }
    }
}

impl fmt::Display for OutcomeRecord {
    /// `FINAL_STATUS | STATUS | TIMESTAMP | TARGET | FILENAME | DETAIL`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file_name = self
            .archive
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "N/A".to_string());

        write!(
            f,
            "FINAL_STATUS | {} | {} | {} | {} | {}",
            self.status,
            self.finished_at.format("%Y-%m-%d %H:%M:%S"),
            self.target,
            file_name,
            self.detail()
        )
    }
}

/// Aggregate of one pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct PassSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub records: Vec<OutcomeRecord>,
}

impl PassSummary {
    pub fn from_records(records: Vec<OutcomeRecord>, elapsed: Duration) -> Self {
        let succeeded = records.iter().filter(|r| r.is_success()).count();
        Self {
            attempted: records.len(),
            succeeded,
            failed: records.len() - succeeded,
            elapsed_ms: elapsed.as_millis() as u64,
            records,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn failed_targets(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.target.as_str())
            .collect()
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PASS_SUMMARY | attempted={} succeeded={} failed={} | elapsed={:.2}s",
            self.attempted,
            self.succeeded,
            self.failed,
            self.elapsed_ms as f64 / 1000.0
        )
    }
}

/// Destination for outcome records
pub trait OutcomeSink: Send + Sync {
    /// Called once per target, in pass order
    fn record(&self, record: &OutcomeRecord);

    /// Called once at the end of the pass
    fn summary(&self, summary: &PassSummary);
}

/// Sink writing records to the tracing log (file and, if enabled, console)
#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

impl OutcomeSink for LogSink {
    fn record(&self, record: &OutcomeRecord) {
        match record.status {
            OutcomeStatus::Success if record.warnings.is_empty() => {
                info!(target: "outcome", "{}", record)
            }
            OutcomeStatus::Success => warn!(target: "outcome", "{}", record),
            OutcomeStatus::Failure => error!(target: "outcome", "{}", record),
        }
    }

    fn summary(&self, summary: &PassSummary) {
        if summary.all_succeeded() {
            info!(target: "outcome", "{}", summary);
        } else {
            error!(
                target: "outcome",
                "{} | failed targets: {}",
                summary,
                summary.failed_targets().join(", ")
            );
        }
    }
}

/// Mock implementation for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Sink that keeps everything in memory
    #[derive(Clone, Default)]
    pub struct MemorySink {
        pub records: Arc<Mutex<Vec<OutcomeRecord>>>,
        pub summaries: Arc<Mutex<Vec<PassSummary>>>,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn get_records(&self) -> Vec<OutcomeRecord> {
            self.records.lock().unwrap().clone()
        }

        pub fn get_summaries(&self) -> Vec<PassSummary> {
            self.summaries.lock().unwrap().clone()
        }

        /// Rendered log lines, records first then summaries
        pub fn lines(&self) -> Vec<String> {
            let mut lines: Vec<String> = self.get_records().iter().map(|r| r.to_string()).collect();
            lines.extend(self.get_summaries().iter().map(|s| s.to_string()));
            lines
        }
    }

    impl OutcomeSink for MemorySink {
        fn record(&self, record: &OutcomeRecord) {
            self.records.lock().unwrap().push(record.clone());
        }

        fn summary(&self, summary: &PassSummary) {
            self.summaries.lock().unwrap().push(summary.clone());
        }
    }
}
