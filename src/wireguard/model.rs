//! WireGuard configuration documents
//!
//! [`GlobalConfig`] is one `[Interface]` section plus its `[Peer]`
//! sections. Both the on-disk configuration and the `wg showconf` dump of a
//! running interface are represented this way.

use std::fmt;
use std::str::FromStr;

use super::endpoint::Endpoint;
use super::fields::{FieldSet, INTERFACE_SCHEMA, PEER_SCHEMA};
use crate::common::{Error, Result};

/// One `[Peer]` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    fields: FieldSet,
}

impl PeerConfig {
    /// Build a peer from declared key-value pairs
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: FieldSet::from_pairs(&PEER_SCHEMA, pairs),
        }
    }

    pub(crate) fn from_fields(fields: FieldSet) -> Self {
        Self { fields }
    }

    /// All fields of the section
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Case-insensitive field lookup
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key)
    }

    pub fn public_key(&self) -> &str {
        self.fields.known("PublicKey")
    }

    pub fn allowed_ips(&self) -> &str {
        self.fields.known("AllowedIPs")
    }

    pub fn persistent_keepalive(&self) -> &str {
        self.fields.known("PersistentKeepalive")
    }

    /// Parsed `Endpoint` field
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the field is empty (a passive peer).
    pub fn endpoint(&self) -> Result<Option<Endpoint>> {
        match self.fields.known("Endpoint") {
            "" => Ok(None),
            text => Endpoint::parse(text).map(Some),
        }
    }
}

impl fmt::Display for PeerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Peer]\n{}", self.fields)
    }
}

/// How drifted endpoints of an interface are corrected, from `OnChange`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionMode {
    /// `wg set` each drifted peer on the running interface
    Set,
    /// Restart the interface's service once
    Restart,
}

impl fmt::Display for CorrectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set => write!(f, "set"),
            Self::Restart => write!(f, "restart"),
        }
    }
}

/// One `[Interface]` section and its peers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    fields: FieldSet,
    peers: Vec<PeerConfig>,
}

/// Alias matching the section name
pub type InterfaceConfig = GlobalConfig;

impl GlobalConfig {
    /// Build an interface from its declared pairs and its peers
    pub fn from_pairs<K, V, I>(pairs: I, peers: Vec<PeerConfig>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            fields: FieldSet::from_pairs(&INTERFACE_SCHEMA, pairs),
            peers,
        }
    }

    pub(crate) fn from_fields(fields: FieldSet, peers: Vec<PeerConfig>) -> Self {
        Self { fields, peers }
    }

    /// Parse configuration text
    pub fn parse(text: &str) -> Result<Self> {
        super::parser::parse_config(text)
    }

    /// All fields of the `[Interface]` section
    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Case-insensitive field lookup
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key)
    }

    /// Peers in source order
    pub fn peers(&self) -> &[PeerConfig] {
        &self.peers
    }

    pub fn listen_port(&self) -> &str {
        self.fields.known("ListenPort")
    }

    /// Raw `OnChange` value
    pub fn on_change(&self) -> &str {
        self.fields.known("OnChange")
    }

    /// Correction mode selected by `OnChange`
    ///
    /// # Returns
    ///
    /// The mode, and whether the value was recognized. Anything other than
    /// `restart` selects [`CorrectionMode::Set`].
    pub fn correction_mode(&self) -> (CorrectionMode, bool) {
        match self.on_change() {
            "restart" => (CorrectionMode::Restart, true),
            "update" | "" => (CorrectionMode::Set, true),
            _ => (CorrectionMode::Set, false),
        }
    }

    /// First peer with exactly this public key
    pub fn find_peer(&self, public_key: &str) -> Option<&PeerConfig> {
        self.peers.iter().find(|p| p.public_key() == public_key)
    }
}

impl FromStr for GlobalConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for GlobalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Interface]\n{}", self.fields)?;
        for peer in &self.peers {
            write!(f, "\n\n{}", peer)?;
        }
        Ok(())
    }
}
