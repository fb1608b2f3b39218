//! Configuration module
//!
//! This module handles the run settings, loading them from the sources in
//! priority order (defaults, JSON file, environment variables, command line
//! arguments) and validating the result.

mod defaults;
mod loader;
mod validator;

pub use self::loader::{load_config, Overrides};
pub use self::validator::{is_valid_interface_name, is_valid_log_level, validate_config};
pub use defaults::{ENV_PREFIX, LOG_LEVEL_STR};

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::common::{ErrorBehavior, Result};

/// Run settings
///
/// Contains everything one reconciliation pass needs to know that is not
/// part of the WireGuard configuration files themselves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    /// Interfaces to check; empty means every `*.conf` in `config_dir`
    pub interfaces: Vec<String>,

    /// DNS server to query instead of the system resolver
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<String>,

    /// Directory holding `<interface>.conf` files
    #[serde(default = "defaults::config_dir")]
    pub config_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "defaults::log_level")]
    pub log_level: String,

    /// Budget of one liveness probe, in seconds
    #[serde(default = "defaults::probe_timeout")]
    pub probe_timeout: u64,

    /// Budget of one DNS query, in seconds
    #[serde(default = "defaults::resolve_timeout")]
    pub resolve_timeout: u64,

    /// Failure policy of resolver and endpoint update commands
    #[serde(default = "defaults::command_errors")]
    pub command_errors: ErrorBehavior,

    /// Failure policy of service start and restart commands
    #[serde(default = "defaults::service_errors")]
    pub service_errors: ErrorBehavior,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            interfaces: Vec::new(),
            resolver: None,
            config_dir: defaults::config_dir(),
            log_level: defaults::log_level(),
            probe_timeout: defaults::probe_timeout(),
            resolve_timeout: defaults::resolve_timeout(),
            command_errors: defaults::command_errors(),
            service_errors: defaults::service_errors(),
        }
    }
}

impl RunConfig {
    /// Liveness probe budget
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }

    /// DNS query budget
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        validate_config(self)
    }
}

/// Log the effective settings
pub fn log_config(config: &RunConfig) {
    use log::info;

    if !log::log_enabled!(log::Level::Info) {
        return;
    }

    info!("=== Settings ===");
    if config.interfaces.is_empty() {
        info!("  Interfaces: all in {}", config.config_dir.display());
    } else {
        info!("  Interfaces: {}", config.interfaces.join(", "));
    }
    info!("  Config directory: {}", config.config_dir.display());
    info!("  Resolver: {}", config.resolver.as_deref().unwrap_or("system"));
    info!("  Probe timeout: {} seconds", config.probe_timeout);
    info!("  Resolve timeout: {} seconds", config.resolve_timeout);
    info!("  Command errors: {}", config.command_errors);
    info!("  Service errors: {}", config.service_errors);
    info!("================");
}
