//! Default configuration values
//!
//! Single source of truth for defaults, used both by serde and by
//! [`RunConfig::default`](super::RunConfig).

use std::env;
use std::path::PathBuf;

use crate::common::ErrorBehavior;

/// Environment variable prefix, without the trailing separator
pub const ENV_PREFIX: &str = "WG_DYNAMIC_REMOTE";

/// Default log level as string
pub const LOG_LEVEL_STR: &str = "info";

/// Default configuration directory on POSIX systems
pub const POSIX_CONFIG_DIR: &str = "/etc/wireguard";

/// Default log level
pub fn log_level() -> String {
    LOG_LEVEL_STR.to_string()
}

/// Default WireGuard configuration directory
///
/// `%ProgramData%\WireGuard` on Windows, `/etc/wireguard` elsewhere.
pub fn config_dir() -> PathBuf {
    if cfg!(windows) {
        let program_data = env::var_os("ProgramData").unwrap_or_else(|| r"C:\ProgramData".into());
        PathBuf::from(program_data).join("WireGuard")
    } else {
        PathBuf::from(POSIX_CONFIG_DIR)
    }
}

/// Default liveness probe budget in seconds
pub fn probe_timeout() -> u64 {
    5
}

/// Default DNS query budget in seconds
pub fn resolve_timeout() -> u64 {
    10
}

/// Default policy for resolver and endpoint update failures
pub fn command_errors() -> ErrorBehavior {
    ErrorBehavior::Fatal
}

/// Default policy for service start and restart failures
///
/// The service may legitimately not be ready yet.
pub fn service_errors() -> ErrorBehavior {
    ErrorBehavior::Print
}
