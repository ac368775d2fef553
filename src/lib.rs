//! Port Mapper - Pterodactyl to OPNsense port forwarding sync
//!
//! This crate polls the Pterodactyl panel for workload port allocations
//! and reconciles them into an OPNsense firewall alias on a fixed interval.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
