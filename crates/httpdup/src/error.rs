//! Error taxonomy for the duplication engine.

/// Errors raised while building, sending or serving duplicated requests.
///
/// Only primary-leg errors ever reach a client. Mirror-leg errors are logged
/// and counted by the mirror task group.
#[derive(Debug, thiserror::Error)]
pub enum DuplicateError {
    #[error("invalid destination {address:?}: {reason}")]
    InvalidDestination { address: String, reason: String },

    #[error("failed to build request: {0}")]
    RequestConstruction(String),

    #[error("destination {destination} unreachable: {source}")]
    DestinationUnreachable {
        destination: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {destination} timed out")]
    TransportTimeout { destination: String },

    #[error("failed to bind listen address {address}: {source}")]
    ListenBind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

impl DuplicateError {
    /// Classify a transport error returned by the HTTP client.
    pub fn from_transport(destination: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DuplicateError::TransportTimeout {
                destination: destination.to_string(),
            }
        } else if err.is_builder() {
            DuplicateError::RequestConstruction(err.to_string())
        } else {
            DuplicateError::DestinationUnreachable {
                destination: destination.to_string(),
                source: err,
            }
        }
    }

    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            DuplicateError::InvalidDestination { .. } => "invalid_destination",
            DuplicateError::RequestConstruction(_) => "request_construction",
            DuplicateError::DestinationUnreachable { .. } => "destination_unreachable",
            DuplicateError::TransportTimeout { .. } => "transport_timeout",
            DuplicateError::ListenBind { .. } => "listen_bind",
        }
    }
}
