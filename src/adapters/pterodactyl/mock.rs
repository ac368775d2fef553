//! Mock allocation source for testing.
//!
//! Implements the `AllocationSource` port over an in-memory allocation
//! list, avoiding the need for a live panel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::Allocation;
use crate::ports::{AllocationFetch, AllocationSource, SourceError};

/// Mock allocation source for testing.
///
/// Returns a canned allocation snapshot; `truncated` and forced errors
/// can be toggled to exercise failure paths.
#[derive(Debug, Default)]
pub struct MockAllocationSource {
    fetch: RwLock<AllocationFetch>,
    /// Optional error to return for all fetches (for error testing)
    force_error: RwLock<Option<SourceError>>,
    fetch_count: AtomicUsize,
}

impl MockAllocationSource {
    /// Creates a new empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an allocation to the snapshot.
    pub fn with_allocation(self, allocation: Allocation) -> Self {
        {
            let mut fetch = self.fetch.write().unwrap();
            fetch.records.push(allocation);
        }
        self
    }

    /// Adds a simple allocation for the given server name and port.
    pub fn with_port(self, server_name: impl Into<String>, port: u32) -> Self {
        let server_name = server_name.into();
        let allocation = Allocation {
            server_name: server_name.clone(),
            server_id: format!("{}-id", server_name),
            server_uuid: format!("{}-uuid", server_name),
            ip: "0.0.0.0".to_string(),
            port,
            is_default: true,
            allocation_key: Allocation::key("allocation", port as u64),
        };
        self.with_allocation(allocation)
    }

    /// Sets the number of servers the snapshot reports.
    pub fn with_servers_seen(self, servers: usize) -> Self {
        self.fetch.write().unwrap().servers_seen = servers;
        self
    }

    /// Marks the snapshot as truncated by a failed page fetch.
    pub fn with_truncated(self) -> Self {
        self.fetch.write().unwrap().truncated = true;
        self
    }

    /// Forces all fetches to return the specified error.
    pub fn with_error(self, error: SourceError) -> Self {
        *self.force_error.write().unwrap() = Some(error);
        self
    }

    /// Replaces the allocation snapshot at runtime.
    pub fn set_records(&self, records: Vec<Allocation>) {
        self.fetch.write().unwrap().records = records;
    }

    /// Returns how many times `fetch_all` was called.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AllocationSource for MockAllocationSource {
    async fn fetch_all(&self) -> Result<AllocationFetch, SourceError> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.force_error.read().unwrap().clone() {
            return Err(error);
        }

        Ok(self.fetch.read().unwrap().clone())
    }
}
