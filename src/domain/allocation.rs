//! Allocation record - one IP+port binding assigned to a panel workload.

use serde::{Deserialize, Serialize};

/// Immutable snapshot of a single port allocation, flattened from the
/// panel's server listing. Rebuilt every fetch cycle and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Display name of the owning server.
    pub server_name: String,
    /// Short identifier of the owning server.
    pub server_id: String,
    /// Full UUID of the owning server.
    pub server_uuid: String,
    /// Bind address of the allocation.
    pub ip: String,
    /// The allocated port.
    pub port: u32,
    /// Whether this is the server's primary allocation.
    pub is_default: bool,
    /// Stable identity of the allocation, `<kind>_<id>`.
    pub allocation_key: String,
}

impl Allocation {
    /// Builds the stable identity string for an allocation.
    pub fn key(kind: &str, id: u64) -> String {
        format!("{}_{}", kind, id)
    }
}
