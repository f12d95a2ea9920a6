//! Tests for the 'run' command
//!
//! A pass processes every target in order: dump, archive, retention.

use db_backup_manager::utils::{FsArchiver, FsRetention};
use std::fs;
use std::io;
use test_utils::{
    archive_names, seed_archives, ConfigBuilder, EventLog, MockArchiveOps, MockDumpOps,
    MockRetentionOps, OutcomeStatus, Recorded, TargetStage, TestContext,
};

fn three_targets() -> ConfigBuilder {
    ConfigBuilder::new()
        .add_target_with_retention("db1", 2)
        .add_target_with_retention("db2", 1)
        .add_target_with_retention("db3", 3)
}

#[test]
fn test_pass_with_one_failing_target() {
    let ctx = TestContext::from_builder(three_targets());
    let layout = ctx.layout();
    let db1_seeded = seed_archives(&layout, "db1", 2);
    let db3_seeded = seed_archives(&layout, "db3", 2);

    let manager = ctx.manager_with(
        MockDumpOps::new().with_failing_target("db3", "mysqldump: Got error: 1049: Unknown database 'db3'"),
    );
    let summary = manager.run_pass(&ctx.targets().unwrap()).unwrap();

    // db1: new archive plus the newer seeded one
    let db1 = archive_names(&layout, "db1");
    assert_eq!(db1.len(), 2);
    assert!(!db1_seeded[0].exists());
    assert!(db1_seeded[1].exists());

    assert_eq!(archive_names(&layout, "db2").len(), 1);

    // db3 failed to dump: its existing archives are untouched
    assert!(db3_seeded.iter().all(|p| p.exists()));
    assert_eq!(archive_names(&layout, "db3").len(), 2);

    assert_eq!((summary.attempted, summary.succeeded, summary.failed), (3, 2, 1));

    let lines = ctx.sink().lines();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("FINAL_STATUS | SUCCESS") && lines[0].contains("| db1 | db1_"));
    assert!(lines[1].starts_with("FINAL_STATUS | SUCCESS") && lines[1].contains("| db2 | db2_"));
    assert!(lines[2].starts_with("FINAL_STATUS | FAILURE") && lines[2].contains("| db3 | N/A |"));
    assert!(lines[2].contains("Unknown database 'db3'"));
    assert!(lines[3].starts_with("PASS_SUMMARY | attempted=3 succeeded=2 failed=1"));
}

#[test]
fn test_targets_processed_strictly_in_sequence() {
    let ctx = TestContext::from_builder(three_targets());
    let log = EventLog::new();

    let manager = ctx.manager_with_steps(
        Recorded::new(MockDumpOps::new().with_failing_target("db2", "boom"), &log),
        Recorded::new(MockArchiveOps::new(), &log),
        Recorded::new(MockRetentionOps::new(), &log),
    );
    manager.run_pass(&ctx.targets().unwrap()).unwrap();

    assert_eq!(
        log.events(),
        vec![
            "dump:db1",
            "archive:db1",
            "retention:db1",
            "dump:db2",
            "dump:db3",
            "archive:db3",
            "retention:db3",
        ]
    );
}

#[test]
fn test_failed_deletion_is_success_with_warning() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().add_target_with_retention("db1", 1));
    let layout = ctx.layout();
    let seeded = seed_archives(&layout, "db1", 2);
    let stuck = seeded[0].clone();

    let manager = ctx.manager_with_steps(
        MockDumpOps::new(),
        FsArchiver::new(layout.clone()),
        FsRetention::with_remover(layout.clone(), move |path| {
            if path == stuck.as_path() {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied"))
            } else {
                fs::remove_file(path)
            }
        }),
    );
    let summary = manager.run_pass(&ctx.targets().unwrap()).unwrap();

    let record = &summary.records[0];
    assert_eq!(record.status, OutcomeStatus::Success);
    assert_eq!(record.archives_deleted, 1);
    assert_eq!(record.warnings.len(), 1);
    assert!(record.warnings[0].contains("Permission denied"));

    // The stuck archive and the new one remain
    assert!(seeded[0].exists());
    assert!(!seeded[1].exists());
    assert_eq!(archive_names(&layout, "db1").len(), 2);
}

#[test]
fn test_archive_failure_keeps_existing_archives() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().add_target_with_retention("db1", 1));
    let layout = ctx.layout();
    let seeded = seed_archives(&layout, "db1", 1);

    let manager = ctx.manager_with_steps(
        MockDumpOps::new(),
        MockArchiveOps::new().with_failing_target("db1"),
        FsRetention::new(layout.clone()),
    );
    let summary = manager.run_pass(&ctx.targets().unwrap()).unwrap();

    assert_eq!(summary.records[0].failed_stage, Some(TargetStage::Archiving));
    assert!(seeded[0].exists());
}

#[test]
fn test_pass_trims_backlog_to_limit() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().add_target_with_retention("db1", 2));
    let layout = ctx.layout();
    seed_archives(&layout, "db1", 4);

    let manager = ctx.manager_with(MockDumpOps::new());
    let targets = ctx.targets().unwrap();

    let summary = manager.run_pass(&targets).unwrap();
    assert_eq!(summary.records[0].archives_deleted, 3);
    assert_eq!(archive_names(&layout, "db1").len(), 2);
}

#[test]
fn test_invalid_target_list_does_nothing() {
    let ctx = TestContext::from_builder(ConfigBuilder::new().add_target("db1"));
    let dumper = MockDumpOps::new();
    let manager = ctx.manager_with(dumper.clone());

    let mut targets = ctx.targets().unwrap();
    targets.push(targets[0].clone());

    assert!(manager.run_pass(&targets).is_err());
    assert!(dumper.get_calls().is_empty());
    assert!(ctx.sink().lines().is_empty());
}

#[cfg(unix)]
#[test]
fn test_pass_with_scripted_dump_tool() {
    use db_backup_manager::BackupManager;

    let builder = three_targets();
    let tool = test_utils::write_fake_dump_tool(builder.temp_dir(), &["db3"]);
    let ctx = TestContext::from_builder(builder.with_dump_program(&tool));
    let layout = ctx.layout();

    let manager = BackupManager::new(ctx.config());
    let summary = manager.run_pass(&ctx.targets().unwrap()).unwrap();

    assert_eq!(summary.failed_targets(), vec!["db3"]);
    assert_eq!(archive_names(&layout, "db1").len(), 1);
    assert_eq!(archive_names(&layout, "db2").len(), 1);
    // No leftovers from the failed dump
    assert!(archive_names(&layout, "db3").is_empty());
}
