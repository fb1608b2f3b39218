//! Access to WireGuard state
//!
//! [`WireGuard`] is the seam between the reconciliation engine and the
//! host: reading the desired and the running configuration of an
//! interface and moving a peer's endpoint. [`WgTool`] implements it with
//! the `wg` command and the configuration directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, info};

use super::endpoint::Endpoint;
use crate::common::process;
use crate::common::{Error, Result};

/// Reads and updates WireGuard interfaces
pub trait WireGuard: Send + Sync {
    /// Text of the running configuration, `None` if the device does not exist
    fn read_live_interface<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

    /// Text of the on-disk configuration, `None` if there is no such file
    fn read_static_interface<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

    /// Point one peer of a running interface at a new endpoint
    fn set_peer_endpoint<'a>(
        &'a self,
        interface: &'a str,
        public_key: &'a str,
        endpoint: &'a Endpoint,
    ) -> BoxFuture<'a, Result<()>>;
}

/// Path of the configuration file of an interface
pub fn static_config_path(config_dir: &Path, interface: &str) -> PathBuf {
    config_dir.join(format!("{}.conf", interface))
}

/// Names of all interfaces that have a configuration file, sorted
pub fn list_config_files(config_dir: &Path) -> Result<Vec<String>> {
    info!("Listing config files in {}", config_dir.display());

    let mut names = Vec::new();
    for entry in fs::read_dir(config_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("conf") || !path.is_file() {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            names.push(stem.to_string());
        }
    }

    names.sort();
    Ok(names)
}

/// [`WireGuard`] backed by the `wg` command line tool
#[derive(Debug, Clone)]
pub struct WgTool {
    config_dir: PathBuf,
    timeout: Duration,
}

impl WgTool {
    /// Create a new `wg` backed accessor
    ///
    /// # Arguments
    ///
    /// * `config_dir` - Directory holding `<interface>.conf` files
    /// * `timeout` - Upper bound for each `wg` invocation
    pub fn new(config_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            config_dir: config_dir.into(),
            timeout,
        }
    }

    /// Directory holding the configuration files
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    async fn showconf(&self, name: &str) -> Result<Option<String>> {
        let args = vec!["showconf".to_string(), name.to_string()];
        let output = process::capture("wg", &args, Some(self.timeout)).await?;

        if !output.success() && output.stderr.contains("No such device") {
            debug!("Interface {} is not running", name);
            return Ok(None);
        }

        output.check().map(Some)
    }

    fn read_file(&self, name: &str) -> Result<Option<String>> {
        let path = static_config_path(&self.config_dir, name);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    async fn set_endpoint(&self, interface: &str, public_key: &str, endpoint: &Endpoint) -> Result<()> {
        let args = vec![
            "set".to_string(),
            interface.to_string(),
            "peer".to_string(),
            public_key.to_string(),
            "endpoint".to_string(),
            endpoint.to_string(),
        ];
        process::execute_drop("wg", &args, Some(self.timeout)).await
    }
}

impl WireGuard for WgTool {
    fn read_live_interface<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        self.showconf(name).boxed()
    }

    fn read_static_interface<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        let result = self.read_file(name);
        async move { result }.boxed()
    }

    fn set_peer_endpoint<'a>(
        &'a self,
        interface: &'a str,
        public_key: &'a str,
        endpoint: &'a Endpoint,
    ) -> BoxFuture<'a, Result<()>> {
        self.set_endpoint(interface, public_key, endpoint).boxed()
    }
}
