//! Adapters - Implementations of the ports against real remote APIs.
//!
//! Each adapter area ships the reqwest-backed client plus an in-memory
//! mock implementing the same port for tests.

pub mod opnsense;
pub mod pterodactyl;
