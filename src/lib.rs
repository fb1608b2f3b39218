//! WireGuard Dynamic Remote: keep hostname endpoints of WireGuard peers current
//!
//! WireGuard resolves a peer's `Endpoint = host:port` only once, when the
//! interface comes up. When the remote side has a dynamic address the
//! tunnel silently breaks at the next address change. This library checks
//! each running peer against the current DNS answer for its configured
//! hostname and moves it to a live address, either in place with `wg set`
//! or by restarting the interface's service.
//!
//! # Example
//!
//! ```no_run
//! use wireguard_dynamic_remote::config::RunConfig;
//! use wireguard_dynamic_remote::reconcile::Runner;
//!
//! #[tokio::main]
//! async fn main() -> wireguard_dynamic_remote::Result<()> {
//!     let settings = RunConfig {
//!         interfaces: vec!["wg0".to_string()],
//!         ..Default::default()
//!     };
//!
//!     let runner = Runner::with_system_tools(settings);
//!     let check = runner.check_interface("wg0").await?;
//!     print!("{}", check.trace);
//!
//!     Ok(())
//! }
//! ```

// Public modules
pub mod common;
pub mod config;
pub mod net;
pub mod reconcile;
pub mod service;
pub mod wireguard;

// Re-export commonly used structures and functions for convenience
pub use common::{Error, ErrorBehavior, Result, Trace};
pub use reconcile::{InterfaceCheck, ReconciliationResult, Reconciler, Runner};
pub use wireguard::{parse_config, Endpoint, GlobalConfig, PeerConfig};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
