//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the sync logic and the two remote systems. Adapters implement these
//! ports; tests substitute in-memory mocks.
//!
//! - `AllocationSource` - fetches workload port allocations from the panel
//! - `AliasStore` - reads and rewrites the firewall's port alias

mod alias_store;
mod allocation_source;

pub use alias_store::{AliasRecord, AliasStore, StoreError};
pub use allocation_source::{AllocationFetch, AllocationSource, SourceError};
