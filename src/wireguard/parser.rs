//! Configuration text parser
//!
//! Parses the INI-like format used by `wg`/`wg-quick`, both for files under
//! the configuration directory and for `wg showconf` output.
//!
//! Keys are matched case-insensitively. A commented-out assignment such as
//! `# OnChange = restart` is adopted when its key is a known field of the
//! section, which lets operators carry keys that `wg-quick` itself would
//! reject.

use log::trace;

use super::fields::{FieldSet, Schema, INTERFACE_SCHEMA, PEER_SCHEMA};
use super::model::{GlobalConfig, PeerConfig};
use crate::common::{Error, Result};

const INTERFACE_MARKER: &str = "[Interface]";
const PEER_MARKER: &str = "[Peer]";

/// Which section the parser is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Before the first recognized section header
    Ignored,
    Interface,
    Peer,
}

/// A `key = value` pair found on one line
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate<'a> {
    key: &'a str,
    value: &'a str,
    commented: bool,
}

impl<'a> Candidate<'a> {
    /// Extract an assignment from a trimmed line, commented or not
    fn from_line(line: &'a str) -> Option<Self> {
        let (body, commented) = match line.strip_prefix('#') {
            Some(rest) => (rest.trim(), true),
            None => (line, false),
        };

        let (key, value) = body.split_once('=')?;
        Some(Self {
            key: key.trim(),
            value: value.trim(),
            commented,
        })
    }
}

/// Turn the buffered lines of one section into a field set
///
/// Known keys are adopted whether or not they were commented out; unknown
/// keys only from real assignments.
fn parse_key_values(lines: &[&str], schema: &'static Schema) -> FieldSet {
    let mut fields = FieldSet::new(schema);

    for candidate in lines.iter().filter_map(|line| Candidate::from_line(line)) {
        match schema.canonical(candidate.key) {
            Some(name) => fields.set(name, candidate.value),
            None if candidate.commented => {
                trace!("Ignoring comment: {} = {}", candidate.key, candidate.value);
            }
            None => fields.set(candidate.key, candidate.value),
        }
    }

    fields
}

/// Section buffers collected by the line scanner
#[derive(Default)]
struct Sections<'a> {
    interface: Option<Vec<&'a str>>,
    peers: Vec<Vec<&'a str>>,
}

impl<'a> Sections<'a> {
    fn commit(&mut self, section: Section, lines: Vec<&'a str>) {
        match section {
            Section::Ignored => {}
            Section::Interface => self.interface = Some(lines),
            Section::Peer if lines.is_empty() => {}
            Section::Peer => self.peers.push(lines),
        }
    }
}

/// Parse configuration text into a [`GlobalConfig`]
///
/// # Arguments
///
/// * `content` - Full text of a configuration file or of `wg showconf`
///
/// # Errors
///
/// [`Error::DuplicateInterfaceSection`] if `[Interface]` appears twice,
/// [`Error::NoInterfaceSection`] if it never appears.
pub fn parse_config(content: &str) -> Result<GlobalConfig> {
    let mut sections = Sections::default();
    let mut section = Section::Ignored;
    let mut buffer: Vec<&str> = Vec::new();

    for line in content.lines() {
        if line.starts_with(INTERFACE_MARKER) {
            sections.commit(section, std::mem::take(&mut buffer));
            if sections.interface.is_some() {
                return Err(Error::DuplicateInterfaceSection);
            }
            section = Section::Interface;
            continue;
        }

        if line.starts_with(PEER_MARKER) {
            sections.commit(section, std::mem::take(&mut buffer));
            section = Section::Peer;
            continue;
        }

        buffer.push(line.trim());
    }
    sections.commit(section, buffer);

    let interface = sections.interface.ok_or(Error::NoInterfaceSection)?;

    let peers = sections
        .peers
        .iter()
        .map(|lines| PeerConfig::from_fields(parse_key_values(lines, &PEER_SCHEMA)))
        .collect();

    Ok(GlobalConfig::from_fields(
        parse_key_values(&interface, &INTERFACE_SCHEMA),
        peers,
    ))
}
