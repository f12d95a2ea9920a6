//! Configuration module for db-backup-manager
//!
//! This module handles loading, validating, and resolving backup targets from
//! a TOML file and, optionally, from numbered `DB{n}_*` environment variables.
//!
//! ## Target Resolution
//!
//! Settings are applied in this order (later overrides earlier):
//! 1. Global defaults (`default_host`, `default_max_backups`)
//! 2. Target-level settings
//!
//! ## Example Usage
//!
//! ```no_run
//! use db_backup_manager::config;
//!
//! let config = config::load_config("backup-config.toml")?;
//! let targets = config::resolve_all_targets(&config, false)?;
//!
//! for target in &targets {
//!     println!("Target: {}, keeps {} archives", target.name, target.max_backups);
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{
    load_config, load_env_targets, resolve_target, targets_from_lookup,
    validate_target, validate_targets, ConfigError, Result,
};
pub use types::*;

/// Resolve file targets followed by environment targets (when enabled), then
/// validate the combined list as one batch.
pub fn resolve_all_targets(config: &Config, include_env: bool) -> Result<Vec<TargetDescriptor>> {
    let mut raw = config.targets.clone();

    if include_env || config.global.env_targets {
        raw.extend(load_env_targets()?);
    }

    let resolved = raw
        .iter()
        .map(|t| resolve_target(t, &config.global))
        .collect::<Result<Vec<_>>>()?;

    if resolved.is_empty() {
        return Err(ConfigError::NoTargets);
    }

    validate_targets(&resolved)?;
    Ok(resolved)
}

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
