//! Endpoint reconciliation
//!
//! The engine that decides, peer by peer, whether a running endpoint still
//! matches its configured hostname, and the runner that drives it over the
//! configured interfaces.

mod engine;
mod outcome;
mod runner;

pub use engine::Reconciler;
pub use outcome::{
    InterfaceState, PeerFault, PeerOutcome, PeerReport, ReconciliationResult, SkipReason,
};
pub use runner::{InterfaceCheck, Runner};
