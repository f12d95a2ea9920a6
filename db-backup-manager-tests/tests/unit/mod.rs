//! Unit tests for db-backup-manager
//!
//! These exercise configuration and the filesystem pipeline steps in
//! isolation.

mod archive;
mod config;
