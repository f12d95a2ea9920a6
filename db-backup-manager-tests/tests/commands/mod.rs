//! Command tests for db-backup-manager
//!
//! These tests drive whole passes through `BackupManager` with mocked or
//! scripted pipeline steps on a temporary backup root.

mod list;
mod prune;
mod run;
