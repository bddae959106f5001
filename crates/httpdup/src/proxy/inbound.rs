//! The inbound request, buffered once so every destination gets the same
//! bytes.

use axum::extract::Request;
use bytes::Bytes;
use http::{HeaderMap, Method};

/// An inbound request with its body read to completion.
///
/// The body is held as [`Bytes`], so each outbound clone shares the buffer
/// instead of competing for a single-read stream.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl InboundRequest {
    /// Read an axum request, buffering at most `max_body_bytes` of body.
    pub async fn from_request(request: Request, max_body_bytes: usize) -> Result<Self, axum::Error> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, max_body_bytes).await?;
        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers: parts.headers,
            body,
        })
    }
}
