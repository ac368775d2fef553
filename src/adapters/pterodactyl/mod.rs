//! Pterodactyl panel adapter.

mod client;
mod mock;

pub use client::PterodactylClient;
pub use mock::MockAllocationSource;
