//! OPNsense firewall adapter.

mod client;
mod mock;

pub use client::OpnsenseClient;
pub use mock::MockAliasStore;
