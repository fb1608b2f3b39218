//! WireGuard configuration handling
//!
//! This module contains the endpoint and configuration document models, the
//! configuration parser, and access to the interfaces of the host.

pub mod control;
pub mod endpoint;
pub mod fields;
pub mod model;
pub mod parser;

// Re-export types
pub use control::{list_config_files, static_config_path, WgTool, WireGuard};
pub use endpoint::Endpoint;
pub use fields::{FieldSet, Schema, INTERFACE_SCHEMA, PEER_SCHEMA};
pub use model::{CorrectionMode, GlobalConfig, InterfaceConfig, PeerConfig};
pub use parser::parse_config;
