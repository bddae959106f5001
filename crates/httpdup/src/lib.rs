//! httpdup: HTTP traffic duplicator.
//!
//! Every inbound request is forwarded to a primary server, whose response is
//! relayed to the caller, and copied to any number of mirror servers whose
//! responses are drained and discarded.

pub mod cli;
pub mod config;
pub mod destination;
pub mod error;
pub mod proxy;
pub mod server;
pub mod stats;

/// Crate version, shown in the startup banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
