//! Relays the primary response to the client.
//!
//! The body is streamed verbatim through a [`RelayBody`] that counts bytes
//! and records totals on the inbound span when the stream ends.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_core::Stream;
use http::{header, HeaderValue, StatusCode};

use super::headers;
use crate::error::DuplicateError;

/// Pass-through body stream. Records `response_bytes` and
/// `total_duration_ms` on `span` once the upstream body is exhausted; the
/// upstream response is released when this is dropped.
struct RelayBody {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    span: tracing::Span,
    start: Instant,
    bytes: u64,
}

impl Stream for RelayBody {
    type Item = Result<Bytes, reqwest::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match self.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                self.bytes += chunk.len() as u64;
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                tracing::warn!(parent: &self.span, error = %e, bytes = self.bytes, "Primary body stream failed mid-relay");
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                self.span.record("response_bytes", self.bytes);
                self.span
                    .record("total_duration_ms", self.start.elapsed().as_millis() as u64);
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Turn the primary response into the client response: same status, same
/// end-to-end headers, body streamed unmodified.
///
/// `span` is the inbound request span; `start` is when the request arrived.
pub fn relay(upstream: reqwest::Response, span: tracing::Span, start: Instant) -> Response {
    let status = upstream.status();
    let headers = headers::end_to_end(upstream.headers(), &[]);
    span.record("status", status.as_u16());

    let body = RelayBody {
        inner: Box::pin(upstream.bytes_stream()),
        span,
        start,
        bytes: 0,
    };

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Client response for a failed primary call: 500 with the error text.
pub fn error_response(err: &DuplicateError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        )],
        format!("{err}\n"),
    )
        .into_response()
}
