//! Interface checks
//!
//! [`Runner`] loads the desired and running configuration of each
//! interface, hands them to the [`Reconciler`] and carries out the service
//! directive that comes back.

use std::sync::Arc;

use log::{error, info};

use super::engine::Reconciler;
use super::outcome::ReconciliationResult;
use crate::common::{Error, Result, Trace};
use crate::config::RunConfig;
use crate::net::{system_resolver, AddressResolver, LivenessProbe, NameResolver, PingProbe};
use crate::service::{system_service_control, ServiceControl};
use crate::wireguard::{list_config_files, parse_config, static_config_path, GlobalConfig, WgTool, WireGuard};

/// Outcome of checking one interface
#[derive(Debug)]
pub struct InterfaceCheck {
    /// Whether every peer of the interface was reconciled
    pub success: bool,
    pub result: ReconciliationResult,
    /// Decisions taken, for the operator
    pub trace: Trace,
}

/// Checks the configured interfaces
pub struct Runner {
    settings: RunConfig,
    wireguard: Arc<dyn WireGuard>,
    reconciler: Reconciler,
    service: Box<dyn ServiceControl>,
}

impl Runner {
    /// Create a runner from explicit collaborators
    pub fn new(
        settings: RunConfig,
        wireguard: Arc<dyn WireGuard>,
        resolver: Box<dyn NameResolver>,
        prober: Arc<dyn LivenessProbe>,
        service: Box<dyn ServiceControl>,
    ) -> Self {
        let resolver = AddressResolver::new(resolver, settings.resolve_timeout(), settings.command_errors);
        let reconciler = Reconciler::new(
            wireguard.clone(),
            resolver,
            prober,
            settings.probe_timeout(),
            settings.command_errors,
        );

        Self {
            settings,
            wireguard,
            reconciler,
            service,
        }
    }

    /// Create a runner backed by the host's tools
    pub fn with_system_tools(settings: RunConfig) -> Self {
        let timeout = settings.resolve_timeout();
        let wireguard = Arc::new(WgTool::new(settings.config_dir.clone(), timeout));
        Self::new(
            settings,
            wireguard,
            system_resolver(),
            Arc::new(PingProbe),
            system_service_control(timeout),
        )
    }

    /// Settings in use
    pub fn settings(&self) -> &RunConfig {
        &self.settings
    }

    /// Interfaces to check
    ///
    /// The configured list, or every configuration file when it is empty.
    pub fn interfaces(&self) -> Result<Vec<String>> {
        if !self.settings.interfaces.is_empty() {
            return Ok(self.settings.interfaces.clone());
        }
        list_config_files(&self.settings.config_dir)
    }

    /// Desired and running configuration of an interface
    ///
    /// # Errors
    ///
    /// [`Error::MissingStaticConfig`] when the interface has no
    /// configuration file, or any parse error of either document.
    pub async fn load_interface(&self, name: &str) -> Result<(GlobalConfig, Option<GlobalConfig>)> {
        let text = self
            .wireguard
            .read_static_interface(name)
            .await?
            .ok_or_else(|| Error::MissingStaticConfig(static_config_path(&self.settings.config_dir, name)))?;
        let desired = parse_config(&text)?;

        let live = match self.wireguard.read_live_interface(name).await? {
            Some(text) => Some(parse_config(&text)?),
            None => None,
        };

        Ok((desired, live))
    }

    /// Check one interface and carry out its service directive
    pub async fn check_interface(&self, name: &str) -> Result<InterfaceCheck> {
        let (desired, live) = self.load_interface(name).await?;

        let mut trace = Trace::new();
        trace.info(format!("Checking interface {}", name));

        let result = {
            let mut scope = trace.indent();
            let result = self
                .reconciler
                .reconcile_interface(
                    name,
                    &desired,
                    live.as_ref(),
                    self.settings.resolver.as_deref(),
                    &mut scope,
                )
                .await?;

            if let Some(directive) = result.directive {
                scope.info(format!("Running service {} for {}", directive, name));
                let applied = self.service.apply(name, directive).await;
                let what = format!("Service {} of {}", directive, name);
                if self.settings.service_errors.handle(applied, &what)?.is_none() {
                    scope.warn(format!("Service {} of {} failed", directive, name));
                }
            }
            result
        };

        let success = result.is_success();
        if success {
            trace.info(format!("Interface {} OK", name));
        } else {
            trace.error(format!("Interface {} has errors", name));
        }

        Ok(InterfaceCheck {
            success,
            result,
            trace,
        })
    }

    /// Check every interface
    ///
    /// A failing interface is logged and does not stop the others.
    ///
    /// # Returns
    ///
    /// `true` if every interface was checked and succeeded
    pub async fn run(&self) -> bool {
        let interfaces = match self.interfaces() {
            Ok(interfaces) => interfaces,
            Err(e) => {
                error!("Cannot list interfaces: {}", e);
                return false;
            }
        };

        if interfaces.is_empty() {
            info!("No interfaces to check");
        }

        let mut ok = true;
        for name in &interfaces {
            match self.check_interface(name).await {
                Ok(check) => ok &= check.success,
                Err(e) => {
                    error!("Checking interface {} failed: {}", name, e);
                    ok = false;
                }
            }
        }
        ok
    }

    /// Canonical rendering of the desired and running configuration
    pub async fn show(&self, name: &str) -> Result<String> {
        let (desired, live) = self.load_interface(name).await?;

        let live = match live {
            Some(live) => live.to_string(),
            None => "# not running".to_string(),
        };
        Ok(format!(
            "### {} (config file)\n{}\n\n### {} (running)\n{}\n",
            name, desired, name, live
        ))
    }
}
