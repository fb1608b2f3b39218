//! Configuration loading functionality
//!
//! Settings are layered with the `config` crate: serde defaults, then an
//! optional JSON file, then `WG_DYNAMIC_REMOTE_*` environment variables.
//! Command line values are applied last through [`Overrides`].

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use log::{debug, info};

use super::defaults::{ENV_PREFIX, LOG_LEVEL_STR};
use super::validator::is_valid_log_level;
use super::RunConfig;
use crate::common::{ErrorBehavior, Result};

/// Values given on the command line
///
/// `None` and empty fields leave the lower layers untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub interfaces: Vec<String>,
    pub resolver: Option<String>,
    pub config_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub probe_timeout: Option<u64>,
    pub resolve_timeout: Option<u64>,
    pub command_errors: Option<ErrorBehavior>,
    pub service_errors: Option<ErrorBehavior>,
}

impl Overrides {
    /// Apply the overrides on top of `config`
    pub fn apply(&self, mut config: RunConfig) -> RunConfig {
        if !self.interfaces.is_empty() {
            config.interfaces = self.interfaces.clone();
        }
        if let Some(resolver) = &self.resolver {
            config.resolver = Some(resolver.clone());
        }
        if let Some(dir) = &self.config_dir {
            config.config_dir = dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(timeout) = self.probe_timeout {
            config.probe_timeout = timeout;
        }
        if let Some(timeout) = self.resolve_timeout {
            config.resolve_timeout = timeout;
        }
        if let Some(behavior) = self.command_errors {
            config.command_errors = behavior;
        }
        if let Some(behavior) = self.service_errors {
            config.service_errors = behavior;
        }
        config
    }
}

/// Load settings from the file and the environment
///
/// # Arguments
///
/// * `config_file` - JSON file to read; it must exist when given
fn load_sources(config_file: Option<&Path>) -> Result<RunConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_file {
        info!("Loading configuration from {}", path.display());
        builder = builder.add_source(File::from(path).format(FileFormat::Json).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("interfaces"),
    );

    let config: RunConfig = builder.build()?.try_deserialize()?;
    debug!("Settings from file and environment: {:?}", config);
    Ok(config)
}

/// Load, merge and validate the settings
///
/// # Arguments
///
/// * `config_file` - Optional JSON settings file
/// * `overrides` - Command line values, highest priority
///
/// # Errors
///
/// [`Error::Config`](crate::common::Error::Config) when a source cannot be
/// read or the merged settings are invalid.
pub fn load_config(config_file: Option<&Path>, overrides: &Overrides) -> Result<RunConfig> {
    let mut config = overrides.apply(load_sources(config_file)?);
    config.validate()?;
    if !is_valid_log_level(&config.log_level) {
        config.log_level = LOG_LEVEL_STR.to_string();
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let overrides = Overrides {
            interfaces: vec!["wg1".to_string()],
            probe_timeout: Some(2),
            service_errors: Some(ErrorBehavior::Ignore),
            ..Default::default()
        };

        let config = overrides.apply(RunConfig {
            interfaces: vec!["wg0".to_string()],
            resolver: Some("9.9.9.9".to_string()),
            ..Default::default()
        });

        assert_eq!(config.interfaces, vec!["wg1"]);
        assert_eq!(config.resolver.as_deref(), Some("9.9.9.9"));
        assert_eq!(config.probe_timeout, 2);
        assert_eq!(config.resolve_timeout, 10);
        assert_eq!(config.service_errors, ErrorBehavior::Ignore);
    }

    #[test]
    fn test_empty_overrides_keep_config() {
        let config = RunConfig {
            log_level: "debug".to_string(),
            ..Default::default()
        };
        assert_eq!(Overrides::default().apply(config.clone()), config);
    }
}
