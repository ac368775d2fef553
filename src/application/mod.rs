//! Application - The sync cycle and the loop that drives it.

mod reconciler;
mod scheduler;

pub use reconciler::{Reconciler, SyncError, SyncOutcome, SyncReport, DEFAULT_ALIAS_DESCRIPTION};
pub use scheduler::Scheduler;
