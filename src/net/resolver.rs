//! Hostname resolution
//!
//! The actual lookup is delegated to a [`NameResolver`]; on POSIX systems
//! that is `dig`, on Windows `Resolve-DnsName`. [`AddressResolver`] turns
//! the tool output into a deduplicated list of addresses.

use std::net::IpAddr;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, error};

use crate::common::process::{self, find_executable};
use crate::common::{ErrorBehavior, Result};

/// Performs raw DNS queries
pub trait NameResolver: Send + Sync {
    /// Query A and AAAA records of `host`
    ///
    /// # Arguments
    ///
    /// * `host` - Name to resolve
    /// * `server` - DNS server to ask instead of the system default
    ///
    /// # Returns
    ///
    /// The tool's output, one record per line
    fn query<'a>(
        &'a self,
        host: &'a str,
        server: Option<&'a str>,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String>>;

    /// Short description used in log messages
    fn kind(&self) -> String;
}

/// `dig +short` resolver
#[derive(Debug, Clone, Default)]
pub struct DigResolver;

impl DigResolver {
    fn arguments(host: &str, server: Option<&str>) -> Vec<String> {
        let mut args = vec!["+short".to_string()];
        if let Some(server) = server {
            args.push(format!("@{}", server));
        }
        args.extend([host, "A", host, "AAAA"].iter().map(|s| s.to_string()));
        args
    }
}

impl NameResolver for DigResolver {
    fn query<'a>(
        &'a self,
        host: &'a str,
        server: Option<&'a str>,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String>> {
        let args = Self::arguments(host, server);
        async move { process::execute_capture("dig", &args, Some(timeout)).await }.boxed()
    }

    fn kind(&self) -> String {
        "dig".to_string()
    }
}

/// PowerShell `Resolve-DnsName` resolver
#[derive(Debug, Clone)]
pub struct PowerShellResolver {
    shell: String,
}

impl PowerShellResolver {
    /// Prefer `pwsh` when installed, fall back to Windows PowerShell
    pub fn new() -> Self {
        let shell = if find_executable("pwsh").is_some() {
            "pwsh"
        } else {
            "powershell.exe"
        };
        Self {
            shell: shell.to_string(),
        }
    }

    fn script(host: &str, server: Option<&str>) -> String {
        let mut script = format!("Resolve-DnsName -Name '{}'", host);
        if let Some(server) = server {
            script.push_str(&format!(" -Server '{}'", server));
        }
        script.push_str(" | Select-Object -ExpandProperty IPAddress");
        script
    }
}

impl Default for PowerShellResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl NameResolver for PowerShellResolver {
    fn query<'a>(
        &'a self,
        host: &'a str,
        server: Option<&'a str>,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<String>> {
        let args = vec!["-Command".to_string(), Self::script(host, server)];
        async move { process::execute_capture(&self.shell, &args, Some(timeout)).await }.boxed()
    }

    fn kind(&self) -> String {
        format!("{} Resolve-DnsName", self.shell)
    }
}

/// Name resolver for the current platform
pub fn system_resolver() -> Box<dyn NameResolver> {
    if cfg!(windows) {
        Box::new(PowerShellResolver::new())
    } else {
        Box::new(DigResolver)
    }
}

/// Extract literal addresses from resolver output
///
/// Blank lines and anything that is not an address (such as the CNAME
/// chain printed by `dig`) are dropped. Order of first appearance is kept.
pub fn parse_addresses(output: &str) -> Vec<IpAddr> {
    let mut addresses: Vec<IpAddr> = Vec::new();
    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.parse::<IpAddr>() {
            Ok(addr) if !addresses.contains(&addr) => addresses.push(addr),
            Ok(_) => {}
            Err(_) => debug!("Skipping non-address resolver line: {}", line),
        }
    }
    addresses
}

/// Resolves hostnames to the set of their current addresses
pub struct AddressResolver {
    backend: Box<dyn NameResolver>,
    timeout: Duration,
    on_error: ErrorBehavior,
}

impl AddressResolver {
    /// Create a new resolver
    ///
    /// # Arguments
    ///
    /// * `backend` - Tool that performs the query
    /// * `timeout` - Upper bound for one query
    /// * `on_error` - What to do when the query itself fails
    pub fn new(backend: Box<dyn NameResolver>, timeout: Duration, on_error: ErrorBehavior) -> Self {
        Self {
            backend,
            timeout,
            on_error,
        }
    }

    /// Resolve `host`
    ///
    /// # Returns
    ///
    /// The distinct addresses of `host`; empty when nothing usable came
    /// back, or when the query failed and the error policy swallowed it.
    pub async fn resolve(&self, host: &str, server: Option<&str>) -> Result<Vec<IpAddr>> {
        let query = self.backend.query(host, server, self.timeout).await;
        let output = match self.on_error.handle(query, &format!("Resolving '{}'", host))? {
            Some(output) => output,
            None => return Ok(Vec::new()),
        };

        let addresses = parse_addresses(&output);
        if addresses.is_empty() {
            error!(
                "{} did not return any addresses for host '{}':\n{}",
                self.backend.kind(),
                host,
                output
            );
        }

        Ok(addresses)
    }
}
