//! Correlation IDs tying one inbound request to its primary and mirror spans.
//!
//! The ID only appears in logs and traces; it is never sent on the wire.

use uuid::Uuid;

/// Generate a new correlation ID (UUID v4).
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
