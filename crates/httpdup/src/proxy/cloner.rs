//! Builds one independent outbound request per destination.

use http::header;
use http::HeaderValue;

use super::headers;
use super::inbound::InboundRequest;
use crate::destination::Destination;
use crate::error::DuplicateError;

/// Framing headers the transport regenerates for every outbound request, on
/// top of the hop-by-hop set.
const TRANSPORT_OWNED_HEADERS: &[&str] = &["host", "content-length"];

/// Clone `inbound` into a request addressed to `destination`.
///
/// Method, path, query and body are carried over, along with every
/// end-to-end header. Repeated headers keep all of their values in their
/// original order.
pub fn build(
    client: &reqwest::Client,
    destination: &Destination,
    inbound: &InboundRequest,
) -> Result<reqwest::Request, DuplicateError> {
    let url = destination.url_for(&inbound.path, inbound.query.as_deref());

    let mut headers = headers::end_to_end(&inbound.headers, TRANSPORT_OWNED_HEADERS);
    headers.insert(header::CONNECTION, HeaderValue::from_static("close"));

    let mut builder = client
        .request(inbound.method.clone(), url)
        .headers(headers);
    if !inbound.body.is_empty() {
        builder = builder.body(inbound.body.clone());
    }

    builder
        .build()
        .map_err(|e| DuplicateError::RequestConstruction(e.to_string()))
}
