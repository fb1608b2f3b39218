//! Error handling module
//!
//! This module defines the error types and result type aliases used in the application.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// WireGuard dynamic remote error type
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Endpoint text that cannot be split into host and port
    #[error("Malformed endpoint '{0}'")]
    MalformedEndpoint(String),

    /// Endpoint text without a port
    #[error("Endpoint '{0}' missing port")]
    MissingPort(String),

    /// A second `[Interface]` section in one document
    #[error("Multiple [Interface] sections found")]
    DuplicateInterfaceSection,

    /// A document without any `[Interface]` section
    #[error("No [Interface] section found")]
    NoInterfaceSection,

    /// The on-disk configuration of an interface does not exist
    #[error("Interface config file {} does not exist", .0.display())]
    MissingStaticConfig(PathBuf),

    /// An external command exited unsuccessfully
    #[error("Command \"{command}\" failed with {}: {stderr}", exit_code_text(.code))]
    Command {
        /// Rendered command line
        command: String,
        /// Exit code, if the process exited normally
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// An operation exceeded its time budget
    #[error("{0} timed out after {1:?}")]
    Timeout(String, Duration),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

fn exit_code_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code".to_string(),
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

/// Result type alias
///
/// This is a `Result` type alias that uses our custom `Error`.
pub type Result<T> = std::result::Result<T, Error>;
