//! Span builder helpers for duplicator instrumentation.

/// Span covering one inbound request, from accept to the end of the relayed
/// body.
///
/// Fields recorded later:
/// - `status`: status code relayed to the client
/// - `mirrors`: number of mirror copies handed to the task group
/// - `response_bytes`: body bytes streamed to the client
/// - `total_duration_ms`: accept to last body byte
#[macro_export]
macro_rules! inbound_request_span {
    ($correlation_id:expr, $method:expr, $path:expr) => {
        tracing::info_span!(
            "inbound_request",
            correlation_id = %$correlation_id,
            method = %$method,
            path = %$path,
            status = tracing::field::Empty,
            mirrors = tracing::field::Empty,
            response_bytes = tracing::field::Empty,
            total_duration_ms = tracing::field::Empty,
        )
    };
}

/// Span for the primary call.
#[macro_export]
macro_rules! primary_forward_span {
    ($correlation_id:expr, $target:expr) => {
        tracing::info_span!(
            "primary_forward",
            correlation_id = %$correlation_id,
            target = %$target,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    };
}

/// Span for one mirror call. Lives inside the spawned mirror task.
#[macro_export]
macro_rules! mirror_request_span {
    ($correlation_id:expr, $target:expr) => {
        tracing::info_span!(
            "mirror_request",
            correlation_id = %$correlation_id,
            target = %$target,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
            drained_bytes = tracing::field::Empty,
        )
    };
}
