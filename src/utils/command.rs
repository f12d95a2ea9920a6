//! Utilities for running commands with proper error handling and timeouts

use anyhow::{Context, Result};
use std::io;
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use tracing::{debug, error};

/// Spawn a prepared command and wait for it, killing it if `timeout` expires.
///
/// Stdio configured on `cmd` is kept as-is; whatever is piped is collected
/// into the returned `Output`. Expiry is reported as `ErrorKind::TimedOut`.
pub fn spawn_and_wait(cmd: Command, timeout: Option<Duration>) -> io::Result<Output> {
    debug!("Running command: {:?}", cmd.get_program());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let mut cmd = tokio::process::Command::from(cmd);
        cmd.kill_on_drop(true);

        let child = cmd.spawn()?;
        let wait = child.wait_with_output();

        match timeout {
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(output) => output,
                Err(_) => Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("Command timed out after {:?}", limit),
                )),
            },
            None => wait.await,
        }
    })
}

/// Run a command with optional timeout
pub fn run_command(program: &str, args: &[&str], timeout: Option<Duration>) -> Result<Output> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    debug!("Running command: {} {}", program, args.join(" "));

    let output = spawn_and_wait(cmd, timeout)
        .context(format!("Failed to execute {}", program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        error!("Command failed: {} {}", program, args.join(" "));
        error!("Stderr: {}", stderr);
        anyhow::bail!(
            "Command failed with exit code {:?}: {}",
            output.status.code(),
            stderr
        );
    }

    Ok(output)
}

/// Run a command and return stdout as string
pub fn run_command_stdout(program: &str, args: &[&str], timeout: Option<Duration>) -> Result<String> {
    let output = run_command(program, args, timeout)?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
