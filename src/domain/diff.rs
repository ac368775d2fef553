//! Three-way port diff between the desired and actual sets.
//!
//! Excluded ports are stripped from both sides before comparison, but any
//! excluded port found on the firewall is kept as a removal so the next
//! write purges it. The diff is diagnostic only: writes always push the
//! full desired set, never a delta.

use serde::Serialize;

use super::port_set::PortSet;

/// Result of comparing the desired port set against the firewall's
/// current alias content under a fixed excluded-port set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortDiff {
    /// Desired ports after removing excluded ones. This is the exact
    /// payload of any write this cycle triggers.
    pub desired: PortSet,
    /// Firewall ports after removing excluded ones.
    pub actual: PortSet,
    /// Ports present in `desired` but missing from the firewall.
    pub to_add: PortSet,
    /// Orphaned firewall ports plus any excluded ports found there.
    pub to_remove: PortSet,
    /// Excluded ports that were present on the firewall.
    pub forbidden_present: PortSet,
    /// Excluded ports that a workload claimed; never forwarded.
    pub blocked_desired: PortSet,
}

impl PortDiff {
    /// Computes the diff from the raw sets as read from both remotes.
    pub fn compute(desired_raw: &PortSet, actual_raw: &PortSet, excluded: &PortSet) -> Self {
        let blocked_desired: PortSet = desired_raw.intersection(excluded).copied().collect();
        let forbidden_present: PortSet = actual_raw.intersection(excluded).copied().collect();

        let desired: PortSet = desired_raw.difference(excluded).copied().collect();
        let actual: PortSet = actual_raw.difference(excluded).copied().collect();

        let to_add: PortSet = desired.difference(&actual).copied().collect();
        let to_remove: PortSet = actual
            .difference(&desired)
            .chain(forbidden_present.iter())
            .copied()
            .collect();

        Self {
            desired,
            actual,
            to_add,
            to_remove,
            forbidden_present,
            blocked_desired,
        }
    }

    /// True when nothing needs to change on the firewall.
    pub fn is_in_sync(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}
