//! Endpoint reconciliation
//!
//! [`Reconciler`] compares the peers of a running interface with the
//! desired configuration. A peer whose configured endpoint is a hostname is
//! checked against the current DNS answer for that name; when the running
//! address is no longer part of it, a live address is picked and either set
//! on the running interface or left for a single service restart.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use log::error;

use super::outcome::{
    InterfaceState, PeerFault, PeerOutcome, PeerReport, ReconciliationResult, SkipReason,
};
use crate::common::{ErrorBehavior, Result, Trace};
use crate::net::{race_addresses, AddressResolver, LivenessProbe};
use crate::service::ServiceDirective;
use crate::wireguard::{CorrectionMode, GlobalConfig, PeerConfig, WireGuard};

/// Reconciles the peers of one interface at a time
pub struct Reconciler {
    wireguard: Arc<dyn WireGuard>,
    resolver: AddressResolver,
    prober: Arc<dyn LivenessProbe>,
    probe_timeout: Duration,
    update_errors: ErrorBehavior,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Arguments
    ///
    /// * `wireguard` - Applies endpoint updates in live-update mode
    /// * `resolver` - Resolves configured hostnames
    /// * `prober` - Liveness probe used to race candidate addresses
    /// * `probe_timeout` - Budget of each liveness probe
    /// * `update_errors` - What to do when an endpoint update fails
    pub fn new(
        wireguard: Arc<dyn WireGuard>,
        resolver: AddressResolver,
        prober: Arc<dyn LivenessProbe>,
        probe_timeout: Duration,
        update_errors: ErrorBehavior,
    ) -> Self {
        Self {
            wireguard,
            resolver,
            prober,
            probe_timeout,
            update_errors,
        }
    }

    /// Reconcile the running peers of `name` with its desired configuration
    ///
    /// # Arguments
    ///
    /// * `name` - Interface name
    /// * `desired` - Parsed configuration file
    /// * `live` - Parsed running configuration, `None` if the device is absent
    /// * `resolver_override` - DNS server to query instead of the system one
    /// * `trace` - Receives one line per decision
    ///
    /// # Errors
    ///
    /// Only failures the error policy declares fatal. Per-peer problems are
    /// reported as [`PeerOutcome::Errored`].
    pub async fn reconcile_interface(
        &self,
        name: &str,
        desired: &GlobalConfig,
        live: Option<&GlobalConfig>,
        resolver_override: Option<&str>,
        trace: &mut Trace,
    ) -> Result<ReconciliationResult> {
        let (mode, recognized) = desired.correction_mode();
        if !recognized {
            trace.warn(format!(
                "Invalid OnChange value '{}', using live update",
                desired.on_change()
            ));
        }

        let live = match live {
            Some(live) if !live.peers().is_empty() => live,
            _ => {
                trace.info(format!("Interface {} is not active", name));
                return Ok(ReconciliationResult::inactive(name, mode));
            }
        };

        let mut outcomes = Vec::with_capacity(live.peers().len());
        for live_peer in live.peers() {
            let public_key = live_peer.public_key();
            trace.info(format!("Peer {}", public_key));

            let mut scope = trace.indent();
            let outcome = self
                .reconcile_peer(name, desired, live_peer, mode, resolver_override, &mut scope)
                .await?;
            match &outcome {
                PeerOutcome::Errored(fault) => scope.error(format!("Error: {}", fault)),
                other => scope.info(format!("Result: {}", other)),
            }
            drop(scope);

            outcomes.push(PeerReport {
                public_key: public_key.to_string(),
                outcome,
            });
        }

        let mut result = ReconciliationResult {
            interface: name.to_string(),
            state: InterfaceState::Active,
            mode,
            outcomes,
            directive: None,
        };

        if mode == CorrectionMode::Restart && result.any_changed() {
            trace.info(format!("Interface {} needs a restart", name));
            result.directive = Some(ServiceDirective::Restart);
        }

        Ok(result)
    }

    async fn reconcile_peer(
        &self,
        interface: &str,
        desired: &GlobalConfig,
        live_peer: &PeerConfig,
        mode: CorrectionMode,
        resolver_override: Option<&str>,
        trace: &mut Trace,
    ) -> Result<PeerOutcome> {
        let public_key = live_peer.public_key();

        let desired_peer = match desired.find_peer(public_key) {
            Some(peer) => peer,
            None => return Ok(PeerOutcome::Skipped(SkipReason::NotInConfig)),
        };

        let desired_endpoint = match desired_peer.endpoint() {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => return Ok(PeerOutcome::Skipped(SkipReason::PassiveEndpoint)),
            Err(e) => return Ok(PeerOutcome::Errored(PeerFault::InvalidEndpoint(e.to_string()))),
        };
        if !desired_endpoint.is_hostname() {
            return Ok(PeerOutcome::Skipped(SkipReason::LiteralAddress));
        }

        let live_endpoint = match live_peer.endpoint() {
            Ok(Some(endpoint)) => endpoint,
            Ok(None) => return Ok(PeerOutcome::Errored(PeerFault::NeverConnected)),
            Err(e) => return Ok(PeerOutcome::Errored(PeerFault::InvalidEndpoint(e.to_string()))),
        };
        let live_addr = match live_endpoint.ip() {
            Some(addr) => addr,
            None => {
                error!(
                    "BUG: running endpoint of peer {} on {} is a hostname: {}",
                    public_key, interface, live_endpoint
                );
                return Ok(PeerOutcome::Errored(PeerFault::InternalConsistencyFault(
                    live_endpoint.host().to_string(),
                )));
            }
        };

        trace.info(format!("Configured endpoint {}", desired_endpoint));
        trace.info(format!("Running endpoint {}", live_endpoint));

        let host = desired_endpoint.host();
        let addresses = self.resolver.resolve(host, resolver_override).await?;
        if addresses.is_empty() {
            return Ok(PeerOutcome::Errored(PeerFault::ResolutionFailed(host.to_string())));
        }
        trace.info(format!("{} resolves to {}", host, join_addresses(&addresses)));

        if addresses.contains(&live_addr) {
            return Ok(PeerOutcome::Unchanged);
        }

        let winner = self.select_address(&addresses, trace).await;
        let target = live_endpoint.with_address(winner);

        if mode == CorrectionMode::Restart {
            return Ok(PeerOutcome::Changed {
                from: live_endpoint,
                to: target,
                applied: false,
            });
        }

        trace.info(format!("Setting endpoint to {}", target));
        let update = self
            .wireguard
            .set_peer_endpoint(interface, public_key, &target)
            .await;
        let failure = update.as_ref().err().map(ToString::to_string);
        let what = format!("Updating endpoint of peer {} on {}", public_key, interface);

        Ok(match self.update_errors.handle(update, &what)? {
            Some(()) => PeerOutcome::Changed {
                from: live_endpoint,
                to: target,
                applied: true,
            },
            None => PeerOutcome::Errored(PeerFault::UpdateFailed(failure.unwrap_or_default())),
        })
    }

    /// Pick the address to move to among a non-empty candidate list
    async fn select_address(&self, addresses: &[IpAddr], trace: &mut Trace) -> IpAddr {
        let first = addresses[0];
        if addresses.len() == 1 {
            return first;
        }

        trace.info(format!("Racing {} addresses", addresses.len()));
        match race_addresses(addresses, self.prober.clone(), self.probe_timeout).await {
            Some(winner) => {
                trace.info(format!("{} answered first", winner));
                winner
            }
            None => {
                trace.warn(format!(
                    "None of {} answered, falling back to {}",
                    join_addresses(addresses),
                    first
                ));
                first
            }
        }
    }
}

fn join_addresses(addresses: &[IpAddr]) -> String {
    addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
