//! Key-value field sets
//!
//! A [`FieldSet`] holds the assignments of one configuration section. Keys
//! that belong to the section's [`Schema`] are stored under their
//! canonical capitalization; everything else is preserved verbatim.

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

/// Known fields of a section kind, in rendering order
#[derive(Debug)]
pub struct Schema {
    names: &'static [&'static str],
    lookup: Lazy<HashMap<String, usize>>,
}

impl Schema {
    const fn new(names: &'static [&'static str], lookup: fn() -> HashMap<String, usize>) -> Self {
        Self {
            names,
            lookup: Lazy::new(lookup),
        }
    }

    /// Canonical field names in declaration order
    pub fn names(&self) -> &'static [&'static str] {
        self.names
    }

    /// Position of a field, matched case-insensitively
    pub fn position(&self, key: &str) -> Option<usize> {
        self.lookup.get(&key.to_lowercase()).copied()
    }

    /// Canonical spelling of a known field
    pub fn canonical(&self, key: &str) -> Option<&'static str> {
        self.position(key).map(|i| self.names[i])
    }
}

fn index(names: &[&str]) -> HashMap<String, usize> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_lowercase(), i))
        .collect()
}

const INTERFACE_FIELD_NAMES: &[&str] = &[
    "ListenPort",
    "PrivateKey",
    "OnChange",
    "PostUp",
    "PostDown",
    "PreUp",
    "PreDown",
    "Address",
    "DNS",
    "MTU",
    "Table",
    "SaveConfig",
];

const PEER_FIELD_NAMES: &[&str] = &[
    "PublicKey",
    "AllowedIPs",
    "Endpoint",
    "PersistentKeepalive",
];

fn interface_index() -> HashMap<String, usize> {
    index(INTERFACE_FIELD_NAMES)
}

fn peer_index() -> HashMap<String, usize> {
    index(PEER_FIELD_NAMES)
}

/// Fields of an `[Interface]` section (wg and wg-quick keys plus `OnChange`)
pub static INTERFACE_SCHEMA: Schema = Schema::new(INTERFACE_FIELD_NAMES, interface_index);

/// Fields of a `[Peer]` section
pub static PEER_SCHEMA: Schema = Schema::new(PEER_FIELD_NAMES, peer_index);

/// Assignments of one section
#[derive(Debug, Clone)]
pub struct FieldSet {
    schema: &'static Schema,
    known: Vec<String>,
    unknown: Vec<(String, String)>,
}

impl FieldSet {
    /// Create an empty field set for a schema
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            known: vec![String::new(); schema.names().len()],
            unknown: Vec::new(),
        }
    }

    /// Build a field set from declared pairs, in declaration order
    pub fn from_pairs<K, V, I>(schema: &'static Schema, pairs: I) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut fields = Self::new(schema);
        for (key, value) in pairs {
            fields.set(key.as_ref(), value);
        }
        fields
    }

    /// Assign a field
    ///
    /// Known keys overwrite the canonical slot. Unknown keys overwrite an
    /// earlier unknown key with the same lowercase spelling in place, taking
    /// over the new spelling.
    pub(crate) fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(i) = self.schema.position(key) {
            self.known[i] = value;
            return;
        }

        match self.unknown.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some(slot) => *slot = (key.to_string(), value),
            None => self.unknown.push((key.to_string(), value)),
        }
    }

    /// Case-insensitive lookup
    ///
    /// Returns `None` for absent keys and for known fields left empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(i) = self.schema.position(key) {
            let value = self.known[i].as_str();
            return if value.is_empty() { None } else { Some(value) };
        }

        self.unknown
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Value of a known field, empty if unset
    pub(crate) fn known(&self, name: &str) -> &str {
        self.schema
            .position(name)
            .map(|i| self.known[i].as_str())
            .unwrap_or("")
    }

    /// Unrecognized fields in insertion order
    pub fn unknown(&self) -> impl Iterator<Item = (&str, &str)> {
        self.unknown.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Schema of this field set
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    fn key_width(&self) -> usize {
        self.schema
            .names()
            .iter()
            .map(|k| k.len())
            .chain(self.unknown.iter().map(|(k, _)| k.len()))
            .max()
            .unwrap_or(0)
    }
}

impl fmt::Display for FieldSet {
    /// Known fields in schema order, then `# other keys` and the rest
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.key_width();
        let mut lines = Vec::new();

        for (name, value) in self.schema.names().iter().zip(&self.known) {
            if value.is_empty() {
                continue;
            }
            lines.push(format!("{:<width$} = {}", name, value, width = width));
        }

        if !self.unknown.is_empty() {
            lines.push("# other keys".to_string());
            for (key, value) in &self.unknown {
                lines.push(format!("{:<width$} = {}", key, value, width = width));
            }
        }

        write!(f, "{}", lines.join("\n"))
    }
}

impl PartialEq for FieldSet {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for FieldSet {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_keys_are_canonicalized() {
        let fields = FieldSet::from_pairs(&PEER_SCHEMA, [("publickey", "abc"), ("ENDPOINT", "h:1")]);
        assert_eq!(fields.get("PublicKey"), Some("abc"));
        assert_eq!(fields.get("endpoint"), Some("h:1"));
        assert_eq!(fields.known("Endpoint"), "h:1");
        assert_eq!(fields.unknown().count(), 0);
    }

    #[test]
    fn test_unknown_keys_last_write_wins() {
        let fields = FieldSet::from_pairs(
            &PEER_SCHEMA,
            [("PresharedKey", "one"), ("AllowedIPs", "10.0.0.0/24"), ("presharedkey", "two")],
        );
        let unknown: Vec<_> = fields.unknown().collect();
        assert_eq!(unknown, vec![("presharedkey", "two")]);
        assert_eq!(fields.get("PRESHAREDKEY"), Some("two"));
    }

    #[test]
    fn test_absent_and_empty_lookup() {
        let fields = FieldSet::from_pairs(&INTERFACE_SCHEMA, [("OnChange", "")]);
        assert_eq!(fields.get("OnChange"), None);
        assert_eq!(fields.get("Nope"), None);
    }

    #[test]
    fn test_render_alignment() {
        let fields = FieldSet::from_pairs(
            &PEER_SCHEMA,
            [("Endpoint", "vpn.example.com:51820"), ("PublicKey", "abc"), ("FwMark", "1")],
        );
        assert_eq!(
            fields.to_string(),
            "PublicKey           = abc\n\
             Endpoint            = vpn.example.com:51820\n\
             # other keys\n\
             FwMark              = 1"
        );
    }

    #[test]
    fn test_equality_by_rendering() {
        let a = FieldSet::from_pairs(&PEER_SCHEMA, [("publickey", "abc"), ("Endpoint", "")]);
        let b = FieldSet::from_pairs(&PEER_SCHEMA, [("PublicKey", "abc")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_schema_lookup() {
        assert_eq!(INTERFACE_SCHEMA.canonical("dns"), Some("DNS"));
        assert_eq!(INTERFACE_SCHEMA.canonical("onchange"), Some("OnChange"));
        assert_eq!(PEER_SCHEMA.canonical("onchange"), None);
    }
}
