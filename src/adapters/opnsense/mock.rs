//! Mock alias store for testing.
//!
//! Implements the `AliasStore` port over an in-memory alias record,
//! recording every write payload so tests can assert on what would have
//! been pushed to the firewall.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::{AliasContent, PortSet};
use crate::ports::{AliasRecord, AliasStore, StoreError};

/// Mock alias store for testing.
///
/// Holds one named alias. Writes mutate the stored record exactly as the
/// firewall would, so idempotence can be tested across repeated syncs.
#[derive(Debug)]
pub struct MockAliasStore {
    alias_name: String,
    handle: String,
    record: RwLock<AliasRecord>,
    /// Every port set passed to `replace_ports`, in call order.
    writes: RwLock<Vec<PortSet>>,
    resolve_count: AtomicUsize,
    apply_count: AtomicUsize,
    /// Optional error to return from `replace_ports`
    replace_error: RwLock<Option<StoreError>>,
    /// Optional error to return from `apply_changes`
    apply_error: RwLock<Option<StoreError>>,
}

impl MockAliasStore {
    /// Creates a store holding an empty alias with the given name.
    pub fn new(alias_name: impl Into<String>) -> Self {
        let alias_name = alias_name.into();
        let record = AliasRecord {
            enabled: "1".to_string(),
            name: alias_name.clone(),
            kind: "port".to_string(),
            content: None,
            description: String::new(),
        };

        Self {
            alias_name,
            handle: "9c3125d8-74f0-4286-a437-bd3ec1c2ab2e".to_string(),
            record: RwLock::new(record),
            writes: RwLock::new(Vec::new()),
            resolve_count: AtomicUsize::new(0),
            apply_count: AtomicUsize::new(0),
            replace_error: RwLock::new(None),
            apply_error: RwLock::new(None),
        }
    }

    /// Seeds the alias with content already in the firewall.
    pub fn with_content(self, content: AliasContent) -> Self {
        self.record.write().unwrap().content = Some(content);
        self
    }

    /// Seeds the alias with a port set, stored in the flat string shape.
    pub fn with_ports(self, ports: PortSet) -> Self {
        self.with_content(AliasContent::from_ports(&ports))
    }

    /// Seeds the alias description.
    pub fn with_description(self, description: impl Into<String>) -> Self {
        self.record.write().unwrap().description = description.into();
        self
    }

    /// Forces `replace_ports` to return the specified error.
    pub fn with_replace_error(self, error: StoreError) -> Self {
        *self.replace_error.write().unwrap() = Some(error);
        self
    }

    /// Forces `apply_changes` to return the specified error.
    pub fn with_apply_error(self, error: StoreError) -> Self {
        *self.apply_error.write().unwrap() = Some(error);
        self
    }

    /// Clears a forced replace error.
    pub fn clear_replace_error(&self) {
        *self.replace_error.write().unwrap() = None;
    }

    /// The alias record as currently stored.
    pub fn record(&self) -> AliasRecord {
        self.record.read().unwrap().clone()
    }

    /// All port sets written so far, in call order.
    pub fn writes(&self) -> Vec<PortSet> {
        self.writes.read().unwrap().clone()
    }

    /// Number of `replace_ports` calls that reached the store.
    pub fn write_count(&self) -> usize {
        self.writes.read().unwrap().len()
    }

    /// Number of `resolve_handle` calls.
    pub fn resolve_count(&self) -> usize {
        self.resolve_count.load(Ordering::SeqCst)
    }

    /// Number of `apply_changes` calls.
    pub fn apply_count(&self) -> usize {
        self.apply_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AliasStore for MockAliasStore {
    async fn resolve_handle(&self, name: &str) -> Result<String, StoreError> {
        self.resolve_count.fetch_add(1, Ordering::SeqCst);

        if name == self.alias_name {
            Ok(self.handle.clone())
        } else {
            Err(StoreError::AliasNotFound(name.to_string()))
        }
    }

    async fn read_record(&self, handle: &str) -> Result<AliasRecord, StoreError> {
        if handle != self.handle {
            return Err(StoreError::UnexpectedResponse(format!(
                "unknown handle {}",
                handle
            )));
        }
        Ok(self.record.read().unwrap().clone())
    }

    async fn replace_ports(
        &self,
        handle: &str,
        ports: &PortSet,
        default_description: &str,
    ) -> Result<(), StoreError> {
        if let Some(error) = self.replace_error.read().unwrap().clone() {
            return Err(error);
        }

        let current = self.read_record(handle).await?;
        let updated = current.with_ports(ports, default_description);

        *self.record.write().unwrap() = updated;
        self.writes.write().unwrap().push(ports.clone());
        Ok(())
    }

    async fn apply_changes(&self) -> Result<(), StoreError> {
        self.apply_count.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.apply_error.read().unwrap().clone() {
            return Err(error);
        }
        Ok(())
    }
}
