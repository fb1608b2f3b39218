//! Liveness race between candidate addresses
//!
//! When a hostname resolves to several addresses, all of them are probed
//! at once and the first one to answer wins. The remaining probes are
//! cancelled as soon as a winner is known.

use std::net::IpAddr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, warn};
use tokio::process::Command;
use tokio::task::JoinSet;

/// Checks whether an address answers
pub trait LivenessProbe: Send + Sync {
    /// Probe `addr` once
    ///
    /// The returned future must stop its work when dropped.
    fn probe(&self, addr: IpAddr, timeout: Duration) -> BoxFuture<'static, bool>;
}

/// ICMP echo through the system `ping` command
#[derive(Debug, Clone, Default)]
pub struct PingProbe;

impl PingProbe {
    fn arguments(addr: IpAddr, timeout: Duration) -> Vec<String> {
        let mut args = if cfg!(windows) {
            vec![
                "-n".to_string(),
                "1".to_string(),
                "-w".to_string(),
                timeout.as_millis().to_string(),
            ]
        } else {
            vec![
                "-c".to_string(),
                "1".to_string(),
                "-W".to_string(),
                timeout.as_secs().max(1).to_string(),
            ]
        };
        args.push(addr.to_string());
        args
    }
}

impl LivenessProbe for PingProbe {
    fn probe(&self, addr: IpAddr, timeout: Duration) -> BoxFuture<'static, bool> {
        let args = Self::arguments(addr, timeout);
        async move {
            let status = Command::new("ping")
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .status()
                .await;

            match status {
                Ok(status) => status.success(),
                Err(e) => {
                    warn!("Failed to run ping for {}: {}", addr, e);
                    false
                }
            }
        }
        .boxed()
    }
}

/// Return the first address that answers a probe
///
/// A single candidate is returned without probing. Each probe is bounded
/// by `per_probe_timeout`; a probe that runs over counts as failed. Once a
/// winner is found the other probes are aborted, and the aborts are
/// awaited before returning.
///
/// # Arguments
///
/// * `addresses` - Candidates
/// * `prober` - Probe implementation
/// * `per_probe_timeout` - Budget of each probe
///
/// # Returns
///
/// The winning address, or `None` if no candidate answered
pub async fn race_addresses(
    addresses: &[IpAddr],
    prober: Arc<dyn LivenessProbe>,
    per_probe_timeout: Duration,
) -> Option<IpAddr> {
    match addresses {
        [] => return None,
        [only] => return Some(*only),
        _ => {}
    }

    let mut probes = JoinSet::new();
    for &addr in addresses {
        let probe = prober.probe(addr, per_probe_timeout);
        probes.spawn(async move {
            let alive = tokio::time::timeout(per_probe_timeout, probe)
                .await
                .unwrap_or(false);
            (addr, alive)
        });
    }

    let mut winner = None;
    while let Some(joined) = probes.join_next().await {
        match joined {
            Ok((addr, true)) => {
                debug!("{} answered first", addr);
                winner = Some(addr);
                break;
            }
            Ok((addr, false)) => debug!("{} did not answer", addr),
            Err(e) => warn!("Probe task failed: {}", e),
        }
    }

    probes.abort_all();
    while probes.join_next().await.is_some() {}

    winner
}
