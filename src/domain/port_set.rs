//! Alias content codec - canonical port sets and their wire shapes.
//!
//! OPNsense returns alias content in one of two shapes: a mapping whose
//! keys are either port strings or synthetic `row_<n>` identifiers, or a
//! newline-delimited string of ports. Writes always use the flat string
//! shape; the firewall accepts it regardless of how prior state was
//! stored. Decoding is deliberately forgiving: entries that match neither
//! rule are skipped so unknown row formats don't break a sync cycle.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A canonical, deduplicated set of port numbers.
///
/// Ports are `u32` rather than `u16`: the remote stores may hold
/// out-of-range values and those pass through untouched.
pub type PortSet = BTreeSet<u32>;

/// One value in the mapping-shaped alias content.
///
/// Only the `selected` field matters; anything else the firewall attaches
/// to a row is ignored. Entries whose wire value is not an object at all
/// (a bare string, number, null) still deserialize, as an entry with no
/// `selected`, so one odd row never fails the whole mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AliasEntry {
    /// The port string for `row_<n>` keys. May be a JSON string or number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected: Option<serde_json::Value>,
}

impl AliasEntry {
    /// Entry holding a selected port value.
    pub fn selected(value: impl Into<serde_json::Value>) -> Self {
        Self {
            selected: Some(value.into()),
        }
    }
}

impl<'de> Deserialize<'de> for AliasEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let selected = match value {
            serde_json::Value::Object(mut fields) => fields.remove("selected"),
            _ => None,
        };
        Ok(Self { selected })
    }
}

/// The firewall's raw representation of a port group.
///
/// Modeled as a tagged union with one decode rule per variant; the encode
/// path is fixed to the string shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasContent {
    /// Mapping shape: port-string or `row_<n>` keys.
    Entries(BTreeMap<String, AliasEntry>),
    /// Flat shape: newline-delimited port strings.
    Text(String),
}

impl Default for AliasContent {
    fn default() -> Self {
        AliasContent::Text(String::new())
    }
}

impl AliasContent {
    /// Decodes the content into a canonical port set.
    ///
    /// Malformed entries never error; they are skipped. An empty string
    /// or an empty mapping decodes to the empty set.
    pub fn decode(&self) -> PortSet {
        let mut ports = PortSet::new();

        match self {
            AliasContent::Entries(entries) => {
                for (key, entry) in entries {
                    if let Some(port) = parse_port(key) {
                        // Keys can be the port itself.
                        ports.insert(port);
                    } else if key.starts_with("row_") {
                        if let Some(port) = entry
                            .selected
                            .as_ref()
                            .and_then(value_as_port_string)
                            .as_deref()
                            .and_then(parse_port)
                        {
                            ports.insert(port);
                        }
                    }
                }
            }
            AliasContent::Text(text) => {
                for line in text.lines() {
                    if let Some(port) = parse_port(line.trim()) {
                        ports.insert(port);
                    }
                }
            }
        }

        ports
    }

    /// Encodes a port set into the flat string shape the firewall accepts
    /// on write: ascending, deduplicated, newline-joined.
    pub fn encode(ports: &PortSet) -> String {
        ports
            .iter()
            .map(|port| port.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Builds content in the write shape for the given port set.
    pub fn from_ports(ports: &PortSet) -> Self {
        AliasContent::Text(Self::encode(ports))
    }
}

/// Parses a digit-only string as a port. Anything else is `None`.
fn parse_port(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Extracts a port string from a `selected` value, which the firewall may
/// serialize as a string or a bare number.
fn value_as_port_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
