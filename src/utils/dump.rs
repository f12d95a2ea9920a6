//! Dump invoker: runs the external database export tool for one target
//!
//! The tool is a black box that writes the dump to stdout and signals
//! success through its exit status. `DumpOperations` is the seam the
//! orchestrator depends on; tests substitute `mock::MockDumpOps`.

use super::command::{run_command_stdout, spawn_and_wait};
use crate::config::{DumpConfig, TargetDescriptor};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest stderr excerpt carried in a failure reason
const STDERR_EXCERPT_CHARS: usize = 2000;

/// Raw dump written by the tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpArtifact {
    pub path: PathBuf,
    pub size_bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("Dump tool '{0}' not found. Ensure it is installed and in PATH")]
    ToolNotFound(String),

    #[error("Failed to start dump tool '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Dump tool exited with {status}: {stderr}{}", mysql_error_hint(.stderr))]
    NonZeroExit { status: String, stderr: String },

    #[error("Dump tool timed out after {0}s")]
    TimedOut(u64),

    #[error("Dump tool produced no output")]
    EmptyOutput,

    #[error("Failed to write dump artifact {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type DumpResult = std::result::Result<DumpArtifact, DumpError>;

/// Abstraction over the dump tool, enabling mocking in tests
pub trait DumpOperations: Send + Sync {
    /// Dump one target into `destination`.
    ///
    /// On failure nothing is left at `destination`.
    fn dump(&self, target: &TargetDescriptor, destination: &Path) -> DumpResult;

    /// Verify the tool is callable and return its version string
    fn check_tool(&self) -> anyhow::Result<String>;
}

/// Dump invoker backed by a real subprocess (`mysqldump` by default)
#[derive(Debug, Clone)]
pub struct CommandDumper {
    config: DumpConfig,
}

impl CommandDumper {
    pub fn new(config: DumpConfig) -> Self {
        Self { config }
    }

    /// Arguments for one target. The secret is never part of them.
    pub fn build_args(&self, target: &TargetDescriptor) -> Vec<String> {
        let mut args = vec!["-h".to_string(), target.host.clone()];

        if let Some(port) = target.port {
            args.push("-P".to_string());
            args.push(port.to_string());
        }

        args.push("-u".to_string());
        args.push(target.user.clone());
        args.extend(self.config.extra_args.iter().cloned());
        args.push(target.database.clone());
        args
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_seconds)
    }

    fn run(&self, target: &TargetDescriptor, destination: &Path) -> DumpResult {
        let io_err = |source: io::Error| DumpError::Io {
            path: destination.to_path_buf(),
            source,
        };

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = File::create(destination).map_err(io_err)?;

        let mut cmd = Command::new(&self.config.program);
        cmd.args(self.build_args(target))
            .env(&self.config.password_env, &target.password)
            .stdin(Stdio::null())
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped());

        let output = spawn_and_wait(cmd, Some(self.timeout())).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => DumpError::ToolNotFound(self.config.program.clone()),
            io::ErrorKind::TimedOut => DumpError::TimedOut(self.config.timeout_seconds),
            _ => DumpError::Spawn {
                program: self.config.program.clone(),
                source: e,
            },
        })?;

        if !output.status.success() {
            return Err(DumpError::NonZeroExit {
                status: output.status.to_string(),
                stderr: stderr_excerpt(&output.stderr),
            });
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("Dump tool stderr for '{}': {}", target.name, stderr.trim());
        }

        let size_bytes = fs::metadata(destination).map_err(io_err)?.len();
        if size_bytes == 0 {
            return Err(DumpError::EmptyOutput);
        }

        Ok(DumpArtifact {
            path: destination.to_path_buf(),
            size_bytes,
        })
    }
}

impl DumpOperations for CommandDumper {
    fn dump(&self, target: &TargetDescriptor, destination: &Path) -> DumpResult {
        info!(
            "Dumping database '{}' on {} for target '{}'",
            target.database, target.host, target.name
        );

        let result = self.run(target, destination);

        match &result {
            Ok(artifact) => debug!(
                "Dump for '{}' written to {:?} ({} bytes)",
                target.name, artifact.path, artifact.size_bytes
            ),
            Err(_) => discard_partial(destination),
        }

        result
    }

    fn check_tool(&self) -> anyhow::Result<String> {
        if which::which(&self.config.program).is_err() {
            return Err(DumpError::ToolNotFound(self.config.program.clone()).into());
        }

        let version = run_command_stdout(&self.config.program, &["--version"], Some(Duration::from_secs(30)))?;
        Ok(version.trim().to_string())
    }
}

/// Trimmed, length-limited stderr for failure reasons
fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();

    if text.is_empty() {
        return "(no stderr output)".to_string();
    }

    if text.chars().count() > STDERR_EXCERPT_CHARS {
        let head: String = text.chars().take(STDERR_EXCERPT_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// MySQL client error number from `... Got error: 1045: ...`
fn mysql_error_code(stderr: &str) -> Option<u32> {
    let (_, rest) = stderr.split_once("Got error: ")?;
    rest.split(|c: char| !c.is_ascii_digit()).next()?.parse().ok()
}

/// Operator hint for well-known MySQL connection errors
pub fn mysql_error_hint(stderr: &str) -> &'static str {
    match mysql_error_code(stderr) {
        Some(1045) => " (check your username and password)",
        Some(1049) => " (database does not exist)",
        Some(2003) => " (cannot connect to the database server)",
        _ => "",
    }
}

/// Remove a partially written artifact, if any
fn discard_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed partial dump {:?}", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial dump {:?}: {}", path, e),
    }
}

/// Mock implementation for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// How a mocked dump should fail
    #[derive(Clone, Debug)]
    pub enum MockDumpFailure {
        NonZeroExit(String),
        EmptyOutput,
        TimedOut,
        ToolNotFound,
    }

    /// Mock dump operations for testing
    #[derive(Clone)]
    pub struct MockDumpOps {
        /// Target names in the order they were dumped
        pub calls: Arc<Mutex<Vec<String>>>,
        /// Configured failures by target name
        failures: Arc<Mutex<HashMap<String, MockDumpFailure>>>,
        /// Bytes written for successful dumps
        payload: Arc<Mutex<Vec<u8>>>,
    }

    impl Default for MockDumpOps {
        fn default() -> Self {
            Self {
                calls: Arc::default(),
                failures: Arc::default(),
                payload: Arc::new(Mutex::new(
                    b"-- MySQL dump\nCREATE TABLE t (id INT);\n".to_vec(),
                )),
            }
        }
    }

    impl MockDumpOps {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure dumps of `target` to fail
        pub fn with_failure(self, target: &str, failure: MockDumpFailure) -> Self {
            self.failures
                .lock()
                .unwrap()
                .insert(target.to_string(), failure);
            self
        }

        /// Configure dumps of `target` to exit non-zero with `stderr`
        pub fn with_failing_target(self, target: &str, stderr: &str) -> Self {
            self.with_failure(target, MockDumpFailure::NonZeroExit(stderr.to_string()))
        }

        /// Configure the dump content
        pub fn with_payload(self, payload: &[u8]) -> Self {
            *self.payload.lock().unwrap() = payload.to_vec();
            self
        }

        /// Get dumped target names in call order
        pub fn get_calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        /// Check if a target was dumped
        pub fn was_dumped(&self, target: &str) -> bool {
            self.calls.lock().unwrap().iter().any(|c| c == target)
        }
    }

    impl DumpOperations for MockDumpOps {
        fn dump(&self, target: &TargetDescriptor, destination: &Path) -> DumpResult {
            self.calls.lock().unwrap().push(target.name.clone());

            let failure = self.failures.lock().unwrap().get(&target.name).cloned();
            if let Some(failure) = failure {
                return Err(match failure {
                    MockDumpFailure::NonZeroExit(stderr) => DumpError::NonZeroExit {
                        status: "exit status: 2".to_string(),
                        stderr,
                    },
                    MockDumpFailure::EmptyOutput => DumpError::EmptyOutput,
                    MockDumpFailure::TimedOut => DumpError::TimedOut(1),
                    MockDumpFailure::ToolNotFound => DumpError::ToolNotFound("mysqldump".to_string()),
                });
            }

            let io_err = |source: io::Error| DumpError::Io {
                path: destination.to_path_buf(),
                source,
            };
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
            let payload = self.payload.lock().unwrap().clone();
            fs::write(destination, &payload).map_err(io_err)?;

            Ok(DumpArtifact {
                path: destination.to_path_buf(),
                size_bytes: payload.len() as u64,
            })
        }

        fn check_tool(&self) -> anyhow::Result<String> {
            Ok("mysqldump  Ver 10.19 (mock)".to_string())
        }
    }
}
