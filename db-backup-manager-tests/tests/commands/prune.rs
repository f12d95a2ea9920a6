//! Tests for the 'prune' command
//!
//! Prune applies retention to each target without dumping.

use test_utils::{
    archive_names, seed_archives, ConfigBuilder, MockDumpOps, ResultAssertions, TestContext,
};

#[test]
fn test_prune_trims_every_target() {
    let ctx = TestContext::from_builder(
        ConfigBuilder::new()
            .add_target_with_retention("db1", 1)
            .add_target_with_retention("db2", 3),
    );
    let layout = ctx.layout();
    seed_archives(&layout, "db1", 4);
    seed_archives(&layout, "db2", 2);

    let dumper = MockDumpOps::new();
    let manager = ctx.manager_with(dumper.clone());
    let results = manager.prune(&ctx.targets().unwrap()).assert_ok();

    let deleted: Vec<_> = results
        .iter()
        .map(|(name, r)| (name.as_str(), r.as_ref().unwrap().deleted_count()))
        .collect();
    assert_eq!(deleted, vec![("db1", 3), ("db2", 0)]);
    assert_eq!(archive_names(&layout, "db1").len(), 1);
    assert_eq!(archive_names(&layout, "db2").len(), 2);
    assert!(dumper.get_calls().is_empty());
    assert!(ctx.sink().lines().is_empty());
}
