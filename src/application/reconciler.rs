//! Reconciler - one synchronization cycle.
//!
//! Each cycle fetches the desired port set from the panel, reads the
//! firewall's current alias content, diffs the two under the excluded-port
//! set, and rewrites the alias only when something differs. The write
//! always pushes the full desired set; the diff is diagnostic. Repeated
//! cycles with unchanged inputs short-circuit to "in sync" without a
//! write, which makes the whole operation idempotent and safe to retry
//! wholesale after any failure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::domain::{PortDiff, PortSet};
use crate::ports::{AliasStore, AllocationSource, SourceError, StoreError};

/// Description written to the alias when it has none of its own.
pub const DEFAULT_ALIAS_DESCRIPTION: &str = "Pterodactyl Port Mapper";

/// Errors that abort a cycle before a write decision could be made.
///
/// Caught at the scheduler boundary; never terminates the loop.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("allocation source failed: {0}")]
    Source(#[from] SourceError),

    #[error("alias store failed: {0}")]
    Store(#[from] StoreError),
}

/// Overall result of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncOutcome {
    /// Desired and actual sets already match; nothing was written.
    InSync,
    /// The alias was rewritten with the desired set.
    Updated,
    /// The firewall rejected the write; remote state is unchanged.
    UpdateFailed,
}

/// Diagnostics for one completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// When the cycle started.
    pub started_at: DateTime<Utc>,
    /// Servers seen in the panel listing.
    pub servers_seen: usize,
    /// Allocations flattened out of the listing.
    pub allocations_seen: usize,
    /// True when the allocation fetch was cut short by a failed page.
    pub partial_data: bool,
    /// Desired ports (excluded already removed); the write payload.
    pub desired: PortSet,
    /// Firewall ports (excluded already removed).
    pub actual: PortSet,
    /// Ports that were missing from the firewall.
    pub to_add: PortSet,
    /// Ports that were orphaned or forbidden on the firewall.
    pub to_remove: PortSet,
    /// Excluded ports found on the firewall.
    pub forbidden_present: PortSet,
    /// Excluded ports claimed by workloads; never forwarded.
    pub blocked_desired: PortSet,
    /// How the cycle ended.
    pub outcome: SyncOutcome,
}

/// Drives one reconciliation cycle between the panel and the firewall.
pub struct Reconciler {
    source: Arc<dyn AllocationSource>,
    store: Arc<dyn AliasStore>,
    alias_name: String,
    excluded: PortSet,
}

impl Reconciler {
    /// Creates a reconciler for one alias.
    ///
    /// The excluded set is fixed for the process lifetime; it is passed in
    /// here rather than read from the environment inside the sync logic.
    pub fn new(
        source: Arc<dyn AllocationSource>,
        store: Arc<dyn AliasStore>,
        alias_name: impl Into<String>,
        excluded: PortSet,
    ) -> Self {
        Self {
            source,
            store,
            alias_name: alias_name.into(),
            excluded,
        }
    }

    /// Runs one sync cycle.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` when the panel fetch or the firewall reads fail
    /// before a write decision. A rejected write is not an error: the
    /// cycle completes with [`SyncOutcome::UpdateFailed`].
    pub async fn sync(&self) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();

        let fetch = self.source.fetch_all().await?;
        if fetch.truncated {
            warn!("allocation fetch was truncated; syncing with partial data");
        }

        let desired_raw: PortSet = fetch.records.iter().map(|a| a.port).collect();

        // The handle may rotate between cycles; resolve it fresh each time.
        let handle = self.store.resolve_handle(&self.alias_name).await?;
        let actual_raw = self.store.read_ports(&handle).await?;

        let diff = PortDiff::compute(&desired_raw, &actual_raw, &self.excluded);

        if !diff.blocked_desired.is_empty() {
            warn!(
                ports = ?diff.blocked_desired,
                "workloads claim excluded ports; they will not be forwarded"
            );
        }
        if !diff.forbidden_present.is_empty() {
            warn!(
                ports = ?diff.forbidden_present,
                "excluded ports present in alias; they will be removed"
            );
        }

        info!(
            servers = fetch.servers_seen,
            allocations = fetch.records.len(),
            desired = diff.desired.len(),
            actual = diff.actual.len(),
            "computed port diff"
        );

        let outcome = if diff.is_in_sync() {
            info!(ports = diff.desired.len(), "alias already in sync");
            SyncOutcome::InSync
        } else {
            for port in &diff.to_add {
                if let Some(owner) = fetch.records.iter().find(|a| a.port == *port) {
                    debug!(port, server = %owner.server_name, "adding port");
                }
            }
            if !diff.to_remove.is_empty() {
                debug!(ports = ?diff.to_remove, "removing orphaned ports");
            }

            match self
                .store
                .replace_ports(&handle, &diff.desired, DEFAULT_ALIAS_DESCRIPTION)
                .await
            {
                Ok(()) => {
                    info!(
                        added = diff.to_add.len(),
                        removed = diff.to_remove.len(),
                        "alias updated"
                    );
                    // Content is already written and idempotent; a failed
                    // reconfigure is retried implicitly next cycle.
                    if let Err(err) = self.store.apply_changes().await {
                        warn!(error = %err, "firewall reconfigure failed; alias content already saved");
                    }
                    SyncOutcome::Updated
                }
                Err(err) => {
                    error!(error = %err, "alias update failed");
                    SyncOutcome::UpdateFailed
                }
            }
        };

        Ok(SyncReport {
            started_at,
            servers_seen: fetch.servers_seen,
            allocations_seen: fetch.records.len(),
            partial_data: fetch.truncated,
            desired: diff.desired,
            actual: diff.actual,
            to_add: diff.to_add,
            to_remove: diff.to_remove,
            forbidden_present: diff.forbidden_present,
            blocked_desired: diff.blocked_desired,
            outcome,
        })
    }
}
