use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub dump: DumpConfig,
    /// Ordered list of backup targets (pass order)
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

/// Global configuration settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Root directory holding one subdirectory of archives per target
    #[serde(default = "default_backup_directory")]
    pub backup_directory: PathBuf,

    /// Archive container format
    #[serde(default)]
    pub compression: ArchiveFormat,

    /// Defaults applied to targets that leave them unset
    #[serde(default = "default_host")]
    pub default_host: String,
    #[serde(default = "default_max_backups")]
    pub default_max_backups: u32,

    /// Also read `DB{n}_*` targets from the environment
    #[serde(default)]
    pub env_targets: bool,

    /// Logging configuration
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_max_files")]
    pub log_max_files: u32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            backup_directory: default_backup_directory(),
            compression: ArchiveFormat::default(),
            default_host: default_host(),
            default_max_backups: default_max_backups(),
            env_targets: false,
            log_directory: default_log_directory(),
            log_level: default_log_level(),
            log_max_files: default_log_max_files(),
        }
    }
}

/// Container format used for archives
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    #[default]
    Zip,
    Bzip2,
}

impl ArchiveFormat {
    /// Every supported container
    pub const ALL: [ArchiveFormat; 2] = [ArchiveFormat::Zip, ArchiveFormat::Bzip2];

    /// File extension (without leading dot) of archives in this format
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "sql.zip",
            ArchiveFormat::Bzip2 => "sql.bz2",
        }
    }
}

/// External dump tool settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DumpConfig {
    /// Dump program, looked up in PATH unless absolute
    #[serde(default = "default_dump_program")]
    pub program: String,

    /// Extra arguments placed before the database name
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Environment variable the secret is handed over in
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Per-target deadline for the dump process
    #[serde(default = "default_dump_timeout")]
    pub timeout_seconds: u64,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            program: default_dump_program(),
            extra_args: Vec::new(),
            password_env: default_password_env(),
            timeout_seconds: default_dump_timeout(),
        }
    }
}

/// Target configuration (raw, before defaults are applied)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TargetConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default)]
    pub user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Read the secret from this file when `password` is not set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_file: Option<PathBuf>,

    #[serde(default)]
    pub database: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backups: Option<u32>,
}

/// Resolved target descriptor handed to the backup core.
///
/// Read-only for the duration of a pass.
#[derive(Clone, PartialEq, Eq)]
pub struct TargetDescriptor {
    pub name: String,
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_backups: u32,
}

impl fmt::Debug for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetDescriptor")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("max_backups", &self.max_backups)
            .finish()
    }
}

// Default value functions

fn default_backup_directory() -> PathBuf { PathBuf::from("~/mysql_dbs_backups") }
fn default_host() -> String { "localhost".to_string() }
fn default_max_backups() -> u32 { 3 }
fn default_log_directory() -> PathBuf { PathBuf::from("~/logs") }
fn default_log_level() -> String { "info".to_string() }
fn default_log_max_files() -> u32 { 10 }
fn default_dump_program() -> String { "mysqldump".to_string() }
fn default_password_env() -> String { "MYSQL_PWD".to_string() }
fn default_dump_timeout() -> u64 { 3600 }
