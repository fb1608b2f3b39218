//! External command execution
//!
//! Every collaborator that talks to the operating system (`wg`, `dig`,
//! `ping`, `systemctl`, PowerShell) goes through this module.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use log::{debug, error};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use super::error::{Error, Result};

/// What to do when an external command fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorBehavior {
    /// Propagate the failure to the caller
    Fatal,
    /// Log the failure at error level and continue
    Print,
    /// Continue silently
    Ignore,
}

impl Default for ErrorBehavior {
    fn default() -> Self {
        Self::Fatal
    }
}

impl fmt::Display for ErrorBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal => write!(f, "fatal"),
            Self::Print => write!(f, "print"),
            Self::Ignore => write!(f, "ignore"),
        }
    }
}

impl std::str::FromStr for ErrorBehavior {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fatal" => Ok(Self::Fatal),
            "print" => Ok(Self::Print),
            "ignore" => Ok(Self::Ignore),
            _ => Err(Error::Config(format!(
                "Invalid error behavior: {}. Valid values are: fatal, print, ignore",
                s
            ))),
        }
    }
}

impl ErrorBehavior {
    /// Apply the behavior to the result of an operation
    ///
    /// # Returns
    ///
    /// `Ok(Some(value))` on success, `Ok(None)` when a failure was swallowed,
    /// and the original error under [`ErrorBehavior::Fatal`].
    pub fn handle<T>(self, result: Result<T>, what: &str) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) => match self {
                Self::Fatal => Err(e),
                Self::Print => {
                    error!("(ignore) {} failed: {}", what, e);
                    Ok(None)
                }
                Self::Ignore => {
                    debug!("(ignore) {} failed: {}", what, e);
                    Ok(None)
                }
            },
        }
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Rendered command line
    pub command: String,
    /// Exit status
    pub status: ExitStatus,
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status zero
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Convert a non-zero exit into [`Error::Command`]
    ///
    /// # Returns
    ///
    /// The trimmed standard output on success.
    pub fn check(self) -> Result<String> {
        if self.success() {
            return Ok(self.stdout.trim().to_string());
        }

        Err(Error::Command {
            command: self.command,
            code: self.status.code(),
            stderr: self.stderr.trim().to_string(),
        })
    }
}

/// Render a command line for logs and error messages
pub fn render_command(program: &str, args: &[String]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(program.to_string());
    parts.extend(args.iter().cloned());
    format!("\"{}\"", parts.join("\" \""))
}

/// Run a command to completion and capture its output
///
/// The child is killed if the returned future is dropped or the optional
/// `timeout` elapses. A non-zero exit is not an error at this level; use
/// [`CommandOutput::check`].
///
/// # Arguments
///
/// * `program` - Executable name or path
/// * `args` - Arguments
/// * `timeout` - Optional upper bound on the run time
pub async fn capture(program: &str, args: &[String], timeout: Option<Duration>) -> Result<CommandOutput> {
    let command = render_command(program, args);
    debug!("Running command: {}", command);

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, child)
            .await
            .map_err(|_| Error::Timeout(command.clone(), limit))?,
        None => child.await,
    }
    .map_err(|e| Error::Other(format!("Failed to run {}: {}", command, e)))?;

    Ok(CommandOutput {
        command,
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Run a command and return its trimmed standard output
///
/// Fails with [`Error::Command`] if the command exits unsuccessfully.
pub async fn execute_capture(program: &str, args: &[String], timeout: Option<Duration>) -> Result<String> {
    capture(program, args, timeout).await?.check()
}

/// Run a command for its side effect only
pub async fn execute_drop(program: &str, args: &[String], timeout: Option<Duration>) -> Result<()> {
    execute_capture(program, args, timeout).await.map(|_| ())
}

/// Locate an executable on `PATH`
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .flat_map(|dir| {
            let candidate = dir.join(name);
            let exe = dir.join(format!("{}.exe", name));
            [candidate, exe]
        })
        .find(|path| path.is_file())
}
