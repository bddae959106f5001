//! Single-request sender used for both the primary and the mirror legs.

use std::time::{Duration, Instant};

use super::cloner;
use super::inbound::InboundRequest;
use crate::destination::Destination;
use crate::error::DuplicateError;

/// Sends outbound requests and classifies transport failures.
///
/// Connections are not pooled and redirects are returned as-is, so the
/// caller sees exactly what the destination answered. Cheap to clone.
#[derive(Clone)]
pub struct DispatchClient {
    client: reqwest::Client,
}

impl DispatchClient {
    /// Build a client whose calls are bounded by `timeout`.
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }

    /// Clone `inbound` for `destination` and send it.
    pub async fn clone_and_send(
        &self,
        destination: &Destination,
        inbound: &InboundRequest,
    ) -> Result<reqwest::Response, DuplicateError> {
        let request = cloner::build(&self.client, destination, inbound)?;
        self.send(destination, request).await
    }

    /// Send one request. Records `status` and `latency_ms` on the current
    /// span.
    pub async fn send(
        &self,
        destination: &Destination,
        request: reqwest::Request,
    ) -> Result<reqwest::Response, DuplicateError> {
        let method = request.method().clone();
        let url = request.url().clone();
        tracing::debug!("> {method} {url} {:?}", request.version());

        let start = Instant::now();
        let result = self.client.execute(request).await;
        let latency = start.elapsed();

        let span = tracing::Span::current();
        span.record("latency_ms", latency.as_millis() as u64);

        match result {
            Ok(response) => {
                let status = response.status();
                span.record("status", status.as_u16());
                tracing::debug!("< {} {method} {url} {latency:?}", status.as_u16());
                Ok(response)
            }
            Err(e) => {
                span.record("status", 0_u16);
                Err(DuplicateError::from_transport(destination.address(), e))
            }
        }
    }
}
