//! Domain - Pure values and algorithms.
//!
//! No I/O lives here. The codec for the firewall's alias content, the
//! allocation snapshot record, and the three-way port diff are all plain
//! functions over canonical sets so they can be tested exhaustively.

mod allocation;
mod diff;
mod port_set;

pub use allocation::Allocation;
pub use diff::PortDiff;
pub use port_set::{AliasContent, AliasEntry, PortSet};
