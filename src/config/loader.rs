use super::types::*;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Target '{target}': missing required field '{field}'")]
    MissingField { target: String, field: &'static str },

    #[error("Target '{target}': max_backups must be at least 1 (got {value})")]
    InvalidRetention { target: String, value: u32 },

    #[error("Target name '{0}' is not usable in archive file names")]
    InvalidName(String),

    #[error("Target '{0}' is defined more than once")]
    DuplicateTarget(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("No backup targets configured")]
    NoTargets,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Load and validate configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validate the settings that do not depend on targets
fn validate_config(config: &Config) -> Result<()> {
    if config.dump.program.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "dump.program must not be empty".to_string(),
        ));
    }

    if config.dump.timeout_seconds == 0 {
        return Err(ConfigError::ValidationError(
            "dump.timeout_seconds must be greater than zero".to_string(),
        ));
    }

    if config.global.default_max_backups == 0 {
        return Err(ConfigError::ValidationError(
            "global.default_max_backups must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Resolve a raw target by applying global defaults and reading its secret
pub fn resolve_target(target: &TargetConfig, global: &GlobalConfig) -> Result<TargetDescriptor> {
    let password = match (&target.password, &target.password_file) {
        (Some(password), _) => password.clone(),
        (None, Some(path)) => fs::read_to_string(super::expand_tilde(path))
            .map_err(|e| {
                ConfigError::ValidationError(format!(
                    "Target '{}': failed to read password file {:?}: {}",
                    target.name, path, e
                ))
            })?
            .trim()
            .to_string(),
        (None, None) => String::new(),
    };

    Ok(TargetDescriptor {
        name: target.name.trim().to_string(),
        host: target
            .host
            .clone()
            .unwrap_or_else(|| global.default_host.clone()),
        port: target.port,
        user: target.user.clone(),
        password,
        database: target.database.clone(),
        max_backups: target.max_backups.unwrap_or(global.default_max_backups),
    })
}

/// Validate a single resolved target
pub fn validate_target(target: &TargetDescriptor) -> Result<()> {
    if target.name.is_empty() {
        return Err(ConfigError::MissingField {
            target: "<unnamed>".to_string(),
            field: "name",
        });
    }

    if !is_valid_name(&target.name) {
        return Err(ConfigError::InvalidName(target.name.clone()));
    }

    let required = [
        ("host", &target.host),
        ("user", &target.user),
        ("password", &target.password),
        ("database", &target.database),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField {
                target: target.name.clone(),
                field,
            });
        }
    }

    if target.max_backups < 1 {
        return Err(ConfigError::InvalidRetention {
            target: target.name.clone(),
            value: target.max_backups,
        });
    }

    Ok(())
}

/// Validate a whole batch: every target individually, then name uniqueness.
///
/// Archive names are derived from the target name, so two targets sharing a
/// name would write into the same namespace.
pub fn validate_targets(targets: &[TargetDescriptor]) -> Result<()> {
    let mut seen = HashSet::new();

    for target in targets {
        validate_target(target)?;

        if !seen.insert(target.name.as_str()) {
            return Err(ConfigError::DuplicateTarget(target.name.clone()));
        }
    }

    Ok(())
}

/// Names end up in directory and file names: `[A-Za-z0-9._-]`, no leading dot
fn is_valid_name(name: &str) -> bool {
    !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Read `DB{n}_*` targets from the process environment
pub fn load_env_targets() -> Result<Vec<TargetConfig>> {
    targets_from_lookup(|key| std::env::var(key).ok())
}

/// Read numbered targets through `lookup`, starting at `DB1_NAME` and stopping
/// at the first index whose name is unset or empty.
pub fn targets_from_lookup<F>(lookup: F) -> Result<Vec<TargetConfig>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut targets = Vec::new();

    for index in 1.. {
        let name = match lookup(&format!("DB{}_NAME", index)) {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => break,
        };

        let max_backups = lookup(&format!("DB{}_MAX_BACKUPS", index))
            .map(|raw| {
                raw.trim().parse::<u32>().map_err(|_| {
                    ConfigError::ValidationError(format!(
                        "DB{}_MAX_BACKUPS is not a number: {}",
                        index, raw
                    ))
                })
            })
            .transpose()?;

        targets.push(TargetConfig {
            name: name.clone(),
            host: lookup(&format!("DB{}_HOST", index)).filter(|h| !h.is_empty()),
            port: None,
            user: lookup(&format!("DB{}_USER", index)).unwrap_or_default(),
            password: lookup(&format!("DB{}_PASS", index)),
            password_file: None,
            database: name,
            max_backups,
        });
    }

    Ok(targets)
}
