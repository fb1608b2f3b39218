//! WireGuard service control
//!
//! Starting or restarting the service that owns an interface. On Linux that
//! is the `wg-quick@<interface>` systemd unit, on Windows the
//! `WireGuardTunnel$<interface>` tunnel service.

use std::fmt;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use log::info;

use crate::common::process::{self, find_executable};
use crate::common::Result;

/// Action requested for an interface's service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceDirective {
    /// Bring up an interface that is not running
    Start,
    /// Restart a running interface so it picks up new endpoints
    Restart,
}

impl fmt::Display for ServiceDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Restart => write!(f, "restart"),
        }
    }
}

/// Starts and restarts interface services
pub trait ServiceControl: Send + Sync {
    /// Carry out `directive` for `interface`
    fn apply<'a>(&'a self, interface: &'a str, directive: ServiceDirective) -> BoxFuture<'a, Result<()>>;
}

/// `systemctl` backed service control
#[derive(Debug, Clone)]
pub struct SystemdControl {
    timeout: Duration,
}

impl SystemdControl {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Unit name of an interface
    pub fn unit_name(interface: &str) -> String {
        format!("wg-quick@{}.service", interface)
    }
}

impl ServiceControl for SystemdControl {
    fn apply<'a>(&'a self, interface: &'a str, directive: ServiceDirective) -> BoxFuture<'a, Result<()>> {
        let args = vec![directive.to_string(), Self::unit_name(interface)];
        async move {
            info!("Running systemctl {} {}", args[0], args[1]);
            process::execute_drop("systemctl", &args, Some(self.timeout)).await
        }
        .boxed()
    }
}

/// PowerShell backed control of WireGuard for Windows tunnel services
#[derive(Debug, Clone)]
pub struct WindowsServiceControl {
    shell: String,
    timeout: Duration,
}

impl WindowsServiceControl {
    pub fn new(timeout: Duration) -> Self {
        let shell = if find_executable("pwsh").is_some() {
            "pwsh"
        } else {
            "powershell.exe"
        };
        Self {
            shell: shell.to_string(),
            timeout,
        }
    }

    /// Service name of an interface
    pub fn service_name(interface: &str) -> String {
        format!("WireGuardTunnel${}", interface)
    }

    fn script(interface: &str, directive: ServiceDirective) -> String {
        let cmdlet = match directive {
            ServiceDirective::Start => "Start-Service",
            ServiceDirective::Restart => "Restart-Service",
        };
        format!("{} '{}'", cmdlet, Self::service_name(interface))
    }
}

impl ServiceControl for WindowsServiceControl {
    fn apply<'a>(&'a self, interface: &'a str, directive: ServiceDirective) -> BoxFuture<'a, Result<()>> {
        let args = vec!["-Command".to_string(), Self::script(interface, directive)];
        async move {
            info!("Running {}", args[1]);
            process::execute_drop(&self.shell, &args, Some(self.timeout)).await
        }
        .boxed()
    }
}

/// Service control for the current platform
pub fn system_service_control(timeout: Duration) -> Box<dyn ServiceControl> {
    if cfg!(windows) {
        Box::new(WindowsServiceControl::new(timeout))
    } else {
        Box::new(SystemdControl::new(timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_display() {
        assert_eq!(ServiceDirective::Start.to_string(), "start");
        assert_eq!(ServiceDirective::Restart.to_string(), "restart");
    }

    #[test]
    fn test_unit_names() {
        assert_eq!(SystemdControl::unit_name("wg0"), "wg-quick@wg0.service");
        assert_eq!(WindowsServiceControl::service_name("home"), "WireGuardTunnel$home");
    }

    #[test]
    fn test_windows_script() {
        assert_eq!(
            WindowsServiceControl::script("home", ServiceDirective::Restart),
            "Restart-Service 'WireGuardTunnel$home'"
        );
        assert_eq!(
            WindowsServiceControl::script("home", ServiceDirective::Start),
            "Start-Service 'WireGuardTunnel$home'"
        );
    }
}
