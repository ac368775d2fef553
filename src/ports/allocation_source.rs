//! Allocation source port - fetches port allocations from the panel.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Allocation;

/// Errors from the allocation source.
///
/// Page-level failures do not surface here: a failed page truncates the
/// fetch (see [`AllocationFetch::truncated`]). This error is reserved for
/// faults that make the fetch itself impossible.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The panel could not be reached at all.
    #[error("panel unreachable: {0}")]
    Unreachable(String),
}

/// Result of one allocation fetch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationFetch {
    /// Number of servers seen across all fetched pages.
    pub servers_seen: usize,
    /// All allocations flattened out of the fetched pages.
    pub records: Vec<Allocation>,
    /// True when pagination stopped early on a failed page. The records
    /// are a partial snapshot; callers still treat them as the full set
    /// (last-write-wins), but the flag is reported so the truncation is
    /// visible per cycle.
    pub truncated: bool,
}

/// Fetches all workload port allocations from the panel.
///
/// # Contract
///
/// Implementations must:
/// - Walk the panel's pages in order, starting at page 1
/// - Treat a missing or malformed pagination block as "single page"
/// - On a failed page fetch, return what was accumulated so far with
///   `truncated` set instead of erroring
#[async_trait]
pub trait AllocationSource: Send + Sync {
    /// Fetches every allocation the panel currently reports.
    async fn fetch_all(&self) -> Result<AllocationFetch, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_source_trait_is_object_safe_and_send_sync() {
        fn _assert_trait_object(_: &dyn AllocationSource) {}
        fn _assert_arc_send_sync<T: Send + Sync + ?Sized>() {}
        _assert_arc_send_sync::<std::sync::Arc<dyn AllocationSource>>();
    }
}
