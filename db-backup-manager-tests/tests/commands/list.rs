//! Tests for the 'list' command
//!
//! Listing reads a target's archives oldest first; the CLI prints them in
//! reverse.

use test_utils::{seed_archives, seeded_timestamp, ConfigBuilder, TestContext};

#[test]
fn test_list_returns_archives_oldest_first() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let layout = ctx.layout();
    let seeded = seed_archives(&layout, "test_db", 3);

    let listed = layout.list_archives("test_db").unwrap();

    let paths: Vec<_> = listed.iter().map(|e| e.path.clone()).collect();
    assert_eq!(paths, seeded);
    assert_eq!(listed[0].timestamp, seeded_timestamp(0));
    assert!(listed.iter().all(|e| e.size_bytes > 0));
}

#[test]
fn test_list_empty_for_new_target() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    assert!(ctx.layout().list_archives("test_db").unwrap().is_empty());
}

#[test]
fn test_list_skips_leftovers() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let layout = ctx.layout();
    seed_archives(&layout, "test_db", 1);

    let dir = layout.target_dir("test_db");
    std::fs::write(dir.join("test_db_20240102_030000.sql.tmp"), "raw").unwrap();
    std::fs::write(dir.join("test_db_20240102_030000.sql.zip.partial"), "half").unwrap();

    assert_eq!(layout.list_archives("test_db").unwrap().len(), 1);
}
