//! Integration tests for db-backup-manager
//!
//! These tests require Docker and run a real pass against MySQL.
//! Run with: `cargo test -p db-backup-manager-tests --test integration -- --ignored`

mod common;
mod mysql;
