//! Reconciliation outcomes
//!
//! The per-peer and per-interface results produced by the engine. None of
//! these are persisted; they are built for one pass and then reported.

use std::fmt;

use thiserror::Error;

use crate::service::ServiceDirective;
use crate::wireguard::{CorrectionMode, Endpoint};

/// Why a peer could not be reconciled
///
/// A fault only affects its own peer and the success of its interface.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeerFault {
    /// Endpoint text of the desired or live peer does not parse
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The running peer has no endpoint yet
    #[error("peer has never connected")]
    NeverConnected,

    /// The running interface reports a hostname where an address is expected
    #[error("running endpoint host '{0}' is not an address")]
    InternalConsistencyFault(String),

    /// The configured hostname resolved to nothing
    #[error("could not resolve '{0}'")]
    ResolutionFailed(String),

    /// Moving the peer to the new endpoint failed
    #[error("endpoint update failed: {0}")]
    UpdateFailed(String),
}

/// Why a running peer was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No peer with this public key in the desired configuration
    NotInConfig,
    /// The desired peer has no endpoint and waits for the remote side
    PassiveEndpoint,
    /// The desired endpoint is already a literal address
    LiteralAddress,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInConfig => write!(f, "not in config"),
            Self::PassiveEndpoint => write!(f, "passive endpoint"),
            Self::LiteralAddress => write!(f, "literal address"),
        }
    }
}

/// Result of reconciling one peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerOutcome {
    Skipped(SkipReason),
    /// The running endpoint is still among the resolved addresses
    Unchanged,
    /// The peer needs, or got, a new endpoint
    Changed {
        from: Endpoint,
        to: Endpoint,
        /// Whether the new endpoint was already set on the running interface
        applied: bool,
    },
    Errored(PeerFault),
}

impl PeerOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, Self::Errored(_))
    }
}

impl fmt::Display for PeerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped(reason) => write!(f, "skipped ({})", reason),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Changed { from, to, applied: true } => write!(f, "changed {} -> {}", from, to),
            Self::Changed { from, to, applied: false } => {
                write!(f, "changed {} -> {} (pending restart)", from, to)
            }
            Self::Errored(fault) => write!(f, "error: {}", fault),
        }
    }
}

/// Outcome of one running peer, identified by its public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerReport {
    pub public_key: String,
    pub outcome: PeerOutcome,
}

/// Whether the interface was up when it was checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceState {
    /// Running with at least one peer
    Active,
    /// Device absent or running without peers
    Inactive,
}

/// Result of reconciling one interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationResult {
    /// Interface name
    pub interface: String,
    pub state: InterfaceState,
    /// Correction mode selected by the desired `OnChange`
    pub mode: CorrectionMode,
    /// One report per running peer, in running order
    pub outcomes: Vec<PeerReport>,
    /// Service action to carry out, if any
    pub directive: Option<ServiceDirective>,
}

impl ReconciliationResult {
    /// Result for an interface that is not running
    pub fn inactive(interface: impl Into<String>, mode: CorrectionMode) -> Self {
        Self {
            interface: interface.into(),
            state: InterfaceState::Inactive,
            mode,
            outcomes: Vec::new(),
            directive: Some(ServiceDirective::Start),
        }
    }

    /// Whether at least one peer needs or got a new endpoint
    pub fn any_changed(&self) -> bool {
        self.outcomes.iter().any(|r| r.outcome.is_changed())
    }

    /// Whether at least one peer could not be reconciled
    pub fn any_errored(&self) -> bool {
        self.outcomes.iter().any(|r| r.outcome.is_errored())
    }

    /// An interface succeeds when none of its peers errored
    pub fn is_success(&self) -> bool {
        !self.any_errored()
    }

    /// Reports of peers that changed
    pub fn changed(&self) -> impl Iterator<Item = &PeerReport> {
        self.outcomes.iter().filter(|r| r.outcome.is_changed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: PeerOutcome) -> PeerReport {
        PeerReport {
            public_key: "key".to_string(),
            outcome,
        }
    }

    #[test]
    fn test_aggregation() {
        let mut result = ReconciliationResult {
            interface: "wg0".to_string(),
            state: InterfaceState::Active,
            mode: CorrectionMode::Set,
            outcomes: vec![
                report(PeerOutcome::Unchanged),
                report(PeerOutcome::Skipped(SkipReason::PassiveEndpoint)),
            ],
            directive: None,
        };
        assert!(!result.any_changed());
        assert!(result.is_success());

        result.outcomes.push(report(PeerOutcome::Errored(PeerFault::NeverConnected)));
        result.outcomes.push(report(PeerOutcome::Changed {
            from: Endpoint::new("1.1.1.1", "51820"),
            to: Endpoint::new("2.2.2.2", "51820"),
            applied: true,
        }));
        assert!(result.any_changed());
        assert!(result.any_errored());
        assert!(!result.is_success());
        assert_eq!(result.changed().count(), 1);
    }

    #[test]
    fn test_inactive() {
        let result = ReconciliationResult::inactive("wg0", CorrectionMode::Restart);
        assert_eq!(result.state, InterfaceState::Inactive);
        assert_eq!(result.directive, Some(ServiceDirective::Start));
        assert!(result.is_success());
    }

    #[test]
    fn test_outcome_display() {
        let changed = PeerOutcome::Changed {
            from: Endpoint::new("1.1.1.1", "51820"),
            to: Endpoint::new("2001:db8::1", "51820"),
            applied: false,
        };
        assert_eq!(
            changed.to_string(),
            "changed 1.1.1.1:51820 -> [2001:db8::1]:51820 (pending restart)"
        );
        assert_eq!(
            PeerOutcome::Errored(PeerFault::ResolutionFailed("h.example".to_string())).to_string(),
            "error: could not resolve 'h.example'"
        );
    }
}
