//! Alias store port - reads and rewrites the firewall's port alias.
//!
//! The remote store has no partial-update operation: every write replaces
//! the full alias record. Handles can rotate between calls, so they are
//! resolved per sync cycle and never cached.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{AliasContent, PortSet};

/// Errors from the alias store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No alias with the given name exists on the firewall.
    #[error("alias '{0}' not found")]
    AliasNotFound(String),
    /// The firewall could not be reached or the transport failed.
    #[error("firewall unreachable: {0}")]
    Unreachable(String),
    /// The firewall answered with something we could not interpret.
    #[error("unexpected firewall response: {0}")]
    UnexpectedResponse(String),
    /// The firewall refused to save the alias update.
    #[error("alias update rejected: {0}")]
    WriteRejected(String),
}

/// The full alias record as held by the firewall.
///
/// Fetched fresh for every operation and echoed back verbatim on write,
/// except for `content` (replaced) and `description` (fallback applies).
/// Mutation is always "build a new record", never in-place assignment, so
/// no field the remote requires is ever dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasRecord {
    /// Enabled flag as the firewall serializes it ("1"/"0").
    pub enabled: String,
    /// Human-readable alias name.
    pub name: String,
    /// Alias type, `type` on the wire (here always a port alias).
    pub kind: String,
    /// Raw alias content; absent when the alias was never populated.
    pub content: Option<AliasContent>,
    /// Free-form description.
    pub description: String,
}

impl AliasRecord {
    /// Decodes the record's content into a canonical port set.
    pub fn ports(&self) -> PortSet {
        self.content
            .as_ref()
            .map(AliasContent::decode)
            .unwrap_or_default()
    }

    /// The record with its content replaced by the encoded port set and
    /// the description fallback applied: an existing non-empty
    /// description wins over the provided default.
    pub fn with_ports(&self, ports: &PortSet, default_description: &str) -> Self {
        let description = if self.description.is_empty() {
            default_description.to_string()
        } else {
            self.description.clone()
        };

        Self {
            enabled: self.enabled.clone(),
            name: self.name.clone(),
            kind: self.kind.clone(),
            content: Some(AliasContent::from_ports(ports)),
            description,
        }
    }
}

/// Reads and rewrites a named port alias on the firewall.
///
/// # Contract
///
/// Implementations must:
/// - Resolve the handle fresh on every call chain; never cache it
/// - Perform `replace_ports` as a full-record read-modify-write
/// - Return `StoreError::WriteRejected` when the firewall does not
///   acknowledge a write as saved
#[async_trait]
pub trait AliasStore: Send + Sync {
    /// Resolves an alias name to the store's stable handle.
    async fn resolve_handle(&self, name: &str) -> Result<String, StoreError>;

    /// Reads the full alias record behind a handle.
    async fn read_record(&self, handle: &str) -> Result<AliasRecord, StoreError>;

    /// Reads the alias content as a canonical port set.
    async fn read_ports(&self, handle: &str) -> Result<PortSet, StoreError> {
        Ok(self.read_record(handle).await?.ports())
    }

    /// Replaces the alias content with the given port set, echoing every
    /// other record field unchanged.
    async fn replace_ports(
        &self,
        handle: &str,
        ports: &PortSet,
        default_description: &str,
    ) -> Result<(), StoreError>;

    /// Triggers the firewall to activate pending alias edits.
    async fn apply_changes(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(description: &str) -> AliasRecord {
        AliasRecord {
            enabled: "1".to_string(),
            name: "pterodactyl_ports".to_string(),
            kind: "port".to_string(),
            content: Some(AliasContent::Text("80".to_string())),
            description: description.to_string(),
        }
    }

    #[test]
    fn with_ports_replaces_only_content() {
        let updated = record("keep me").with_ports(&PortSet::from([443, 22]), "default");

        assert_eq!(updated.enabled, "1");
        assert_eq!(updated.name, "pterodactyl_ports");
        assert_eq!(updated.kind, "port");
        assert_eq!(updated.content, Some(AliasContent::Text("22\n443".to_string())));
        assert_eq!(updated.description, "keep me");
    }

    #[test]
    fn with_ports_falls_back_to_default_description() {
        let updated = record("").with_ports(&PortSet::from([80]), "Pterodactyl Port Mapper");

        assert_eq!(updated.description, "Pterodactyl Port Mapper");
    }

    #[test]
    fn ports_of_absent_content_is_empty() {
        let mut rec = record("");
        rec.content = None;

        assert!(rec.ports().is_empty());
    }

    #[test]
    fn alias_store_trait_is_object_safe_and_send_sync() {
        fn _assert_trait_object(_: &dyn AliasStore) {}
        fn _assert_arc_send_sync<T: Send + Sync + ?Sized>() {}
        _assert_arc_send_sync::<std::sync::Arc<dyn AliasStore>>();
    }
}
