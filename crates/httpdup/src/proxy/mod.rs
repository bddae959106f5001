//! Duplication engine: cloning, primary forwarding, mirror fan-out and
//! response relay.

pub mod client;
pub mod cloner;
pub mod correlation;
pub mod dispatcher;
pub mod headers;
pub mod inbound;
pub mod mirror;
pub mod relay;
