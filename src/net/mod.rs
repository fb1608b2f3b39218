//! Network lookups
//!
//! This module resolves peer hostnames and picks a live address among the
//! results.

mod race;
mod resolver;

pub use race::{race_addresses, LivenessProbe, PingProbe};
pub use resolver::{
    parse_addresses, system_resolver, AddressResolver, DigResolver, NameResolver, PowerShellResolver,
};
