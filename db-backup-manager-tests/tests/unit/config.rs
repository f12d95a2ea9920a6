//! Unit tests for configuration loading and validation
//!
//! These tests verify config parsing, target resolution, and the checks
//! applied to a batch of targets before a pass.

use db_backup_manager::config::{
    load_config, resolve_all_targets, targets_from_lookup, validate_targets, ArchiveFormat,
    ConfigError,
};
use rstest::rstest;
use serial_test::serial;
use std::collections::HashMap;
use test_utils::{
    duplicate_target_toml, invalid_retention_toml, minimal_config_toml, sample_target,
    ConfigBuilder, ResultAssertions, TestContext,
};

#[test]
fn test_config_loading_valid() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal().add_target_with_retention("shop", 7));
    let config_path = ctx.write_config();

    let loaded = load_config(&config_path).assert_ok();
    let targets = resolve_all_targets(&loaded, false).assert_ok();

    assert_eq!(targets.len(), 2);
    assert_eq!(targets[1].name, "shop");
    assert_eq!(targets[1].max_backups, 7);
    assert_eq!(targets[0].max_backups, loaded.global.default_max_backups);
}

#[test]
fn test_minimal_template_loads() {
    let ctx = TestContext::from_builder(ConfigBuilder::new());
    let content = minimal_config_toml()
        .replace("{backup_dir}", "/tmp/db-backups")
        .replace("{log_dir}", "/tmp/db-logs");
    let path = ctx.create_file("minimal.toml", &content);

    let config = load_config(&path).assert_ok();
    assert_eq!(config.global.compression, ArchiveFormat::Zip);
    assert_eq!(config.dump.program, "mysqldump");
    assert_eq!(config.targets[0].name, "test_db");
}

#[test]
fn test_invalid_retention_rejected() {
    let ctx = TestContext::from_builder(ConfigBuilder::new());
    let path = ctx.create_file("config.toml", invalid_retention_toml());

    let config = load_config(&path).assert_ok();
    let err = resolve_all_targets(&config, false).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidRetention { value: 0, .. }));
}

#[test]
fn test_duplicate_target_rejected() {
    let ctx = TestContext::from_builder(ConfigBuilder::new());
    let path = ctx.create_file("config.toml", duplicate_target_toml());

    let config = load_config(&path).assert_ok();
    resolve_all_targets(&config, false).assert_err_contains("shop");
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let ctx = TestContext::from_builder(ConfigBuilder::new());
    let path = ctx.create_file("config.toml", "[[targets]\nname = ");

    assert!(matches!(load_config(&path), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_missing_file_is_read_error() {
    let ctx = TestContext::from_builder(ConfigBuilder::new());
    let missing = ctx.temp_dir().join("nope.toml");

    assert!(matches!(load_config(missing), Err(ConfigError::ReadError(_))));
}

#[test]
fn test_empty_target_list_rejected() {
    let config = ConfigBuilder::new().build();
    assert!(matches!(
        resolve_all_targets(&config, false),
        Err(ConfigError::NoTargets)
    ));
}

#[rstest]
#[case::empty_name("", 1)]
#[case::path_separator("a/b", 1)]
#[case::parent_dir("..", 1)]
#[case::leading_dot(".hidden", 1)]
#[case::space("my db", 1)]
#[case::zero_retention("shop", 0)]
fn test_invalid_target_rejected(#[case] name: &str, #[case] max_backups: u32) {
    let targets = vec![sample_target(name, max_backups)];
    assert!(validate_targets(&targets).is_err());
}

#[rstest]
#[case("shop", 1)]
#[case("shop_prod", 3)]
#[case("db-2.replica", 30)]
fn test_valid_target_accepted(#[case] name: &str, #[case] max_backups: u32) {
    let targets = vec![sample_target(name, max_backups)];
    validate_targets(&targets).assert_ok();
}

#[test]
fn test_prefix_names_are_distinct_targets() {
    let targets = vec![sample_target("db1", 1), sample_target("db10", 1)];
    validate_targets(&targets).assert_ok();
}

#[test]
fn test_env_lookup_numbering() {
    let vars: HashMap<&str, &str> = [
        ("DB1_NAME", "db1"),
        ("DB1_USER", "u1"),
        ("DB1_PASS", "p1"),
        ("DB1_MAX_BACKUPS", "2"),
        ("DB2_NAME", "db2"),
        ("DB2_USER", "u2"),
        ("DB2_PASS", "p2"),
        ("DB2_HOST", "db2.internal"),
        // Gap at DB3: DB4 is never read
        ("DB4_NAME", "db4"),
    ]
    .into_iter()
    .collect();

    let targets = targets_from_lookup(|k| vars.get(k).map(|v| v.to_string())).assert_ok();

    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0].name, "db1");
    assert_eq!(targets[0].database, "db1");
    assert_eq!(targets[0].max_backups, Some(2));
    assert_eq!(targets[1].host.as_deref(), Some("db2.internal"));
}

#[test]
#[serial]
fn test_env_targets_appended_after_file_targets() {
    std::env::set_var("DB1_NAME", "env_db");
    std::env::set_var("DB1_USER", "backup");
    std::env::set_var("DB1_PASS", "secret");
    std::env::remove_var("DB2_NAME");

    let config = ConfigBuilder::minimal().build();
    let result = resolve_all_targets(&config, true);

    std::env::remove_var("DB1_NAME");
    std::env::remove_var("DB1_USER");
    std::env::remove_var("DB1_PASS");

    let targets = result.assert_ok();
    let names: Vec<_> = targets.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["test_db", "env_db"]);
}
