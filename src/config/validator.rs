//! Configuration validator
//!
//! This module provides functionality for validating the run settings.

use log::warn;

use super::defaults::LOG_LEVEL_STR;
use super::RunConfig;
use crate::common::{Error, Result};

/// Longest interface name the kernel accepts
const MAX_INTERFACE_NAME: usize = 15;

/// Validate the settings
pub fn validate_config(config: &RunConfig) -> Result<()> {
    validate_interfaces(config)?;
    validate_timeouts(config)?;
    validate_general_settings(config)?;
    Ok(())
}

/// Whether `name` can be a WireGuard interface name
///
/// Up to 15 characters out of `A-Z a-z 0-9 _ = + . -`.
pub fn is_valid_interface_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_INTERFACE_NAME
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '=' | '+' | '.' | '-'))
}

fn validate_interfaces(config: &RunConfig) -> Result<()> {
    for name in &config.interfaces {
        if !is_valid_interface_name(name) {
            return Err(Error::Config(format!("Invalid interface name: '{}'", name)));
        }
    }
    Ok(())
}

fn validate_timeouts(config: &RunConfig) -> Result<()> {
    if config.probe_timeout == 0 {
        return Err(Error::Config("Probe timeout must be greater than 0".to_string()));
    }

    if config.resolve_timeout == 0 {
        return Err(Error::Config("Resolve timeout must be greater than 0".to_string()));
    }

    Ok(())
}

/// Whether `level` is one of the levels `init_logger` understands
pub fn is_valid_log_level(level: &str) -> bool {
    matches!(level, "error" | "warn" | "info" | "debug" | "trace")
}

fn validate_general_settings(config: &RunConfig) -> Result<()> {
    if !is_valid_log_level(&config.log_level) {
        warn!(
            "Invalid log level: {}. Using default: {}",
            config.log_level, LOG_LEVEL_STR
        );
    }

    if let Some(resolver) = &config.resolver {
        if resolver.trim().is_empty() {
            return Err(Error::Config("Resolver must not be empty".to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_names() {
        assert!(is_valid_interface_name("wg0"));
        assert!(is_valid_interface_name("home-office.1"));
        assert!(is_valid_interface_name("a_b=c+d"));
        assert!(!is_valid_interface_name(""));
        assert!(!is_valid_interface_name("wg 0"));
        assert!(!is_valid_interface_name("../etc/passwd"));
        assert!(!is_valid_interface_name("sixteen-chars-xx"));
    }

    #[test]
    fn test_validate_config() {
        assert!(validate_config(&RunConfig::default()).is_ok());

        let zero_probe = RunConfig {
            probe_timeout: 0,
            ..Default::default()
        };
        assert!(matches!(validate_config(&zero_probe), Err(Error::Config(_))));

        let zero_resolve = RunConfig {
            resolve_timeout: 0,
            ..Default::default()
        };
        assert!(validate_config(&zero_resolve).is_err());

        let bad_name = RunConfig {
            interfaces: vec!["wg0".to_string(), "bad/name".to_string()],
            ..Default::default()
        };
        assert!(validate_config(&bad_name).is_err());

        let blank_resolver = RunConfig {
            resolver: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(validate_config(&blank_resolver).is_err());
    }
}
