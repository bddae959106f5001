//! Axum HTTP server: catch-all duplicating route, listener, graceful
//! shutdown with mirror draining.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::DuplicatorConfig;
use crate::error::DuplicateError;
use crate::proxy::correlation;
use crate::proxy::dispatcher::DuplicationDispatcher;
use crate::proxy::inbound::InboundRequest;
use crate::proxy::relay;
use crate::stats::DuplicatorStats;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DuplicatorConfig>,
    pub dispatcher: DuplicationDispatcher,
    pub stats: DuplicatorStats,
}

/// Every method on every path goes to the duplicating handler.
pub fn router(state: AppState) -> Router {
    Router::new()
        .fallback(handle_duplicate)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bind the configured listen address and serve until Ctrl+C.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let listen_addr = state.config.server.listen_address.clone();

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .map_err(|source| DuplicateError::ListenBind {
            address: listen_addr.clone(),
            source,
        })?;
    tracing::info!(address = %listen_addr, "httpdup listening");

    serve(listener, state, shutdown_signal()).await
}

/// Serve an already-bound listener until `shutdown` resolves, then wait for
/// running mirror calls up to `mirror.drain_timeout_secs`.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let tasks = state.dispatcher.mirror_tasks().clone();
    let drain_timeout = Duration::from_secs(state.config.mirror.drain_timeout_secs);
    let stats = state.stats.clone();

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;

    let pending = tasks.in_flight();
    if pending > 0 {
        tracing::info!(in_flight = pending, "Waiting for mirror requests to finish");
    }
    if !tasks.drain(drain_timeout).await {
        tracing::warn!(
            abandoned = tasks.in_flight(),
            timeout_secs = drain_timeout.as_secs(),
            "Mirror requests still running at shutdown"
        );
    }

    let s = stats.snapshot();
    tracing::info!(
        inbound_requests = s.inbound_requests,
        primary_errors = s.primary_errors,
        mirrors_dispatched = s.mirrors_dispatched,
        mirrors_succeeded = s.mirrors_succeeded,
        mirrors_failed = s.mirrors_failed,
        mirrors_skipped = s.mirrors_skipped,
        mirrors_panicked = s.mirrors_panicked,
        "httpdup shut down gracefully"
    );
    Ok(())
}

/// Duplicating handler.
///
/// 1. Buffer the inbound request once
/// 2. Hand mirror copies to the task group (not awaited)
/// 3. Await the primary call
/// 4. Relay the primary response, or a 500 carrying the error text
async fn handle_duplicate(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let start = Instant::now();
    let correlation_id = correlation::generate_id();
    let span = httpdup_tracing::inbound_request_span!(
        &correlation_id,
        request.method(),
        request.uri().path()
    );
    state.stats.inc_inbound();

    async {
        let max_body_bytes = state.config.server.max_body_bytes;
        let inbound = match InboundRequest::from_request(request, max_body_bytes).await {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::warn!(error = %e, max_body_bytes, "Failed to read request body");
                tracing::Span::current().record("status", StatusCode::BAD_REQUEST.as_u16());
                return body_rejected(max_body_bytes);
            }
        };

        match state.dispatcher.handle(inbound, &correlation_id).await {
            Ok(upstream) => relay::relay(upstream, tracing::Span::current(), start),
            Err(e) => {
                state.stats.inc_primary_errors();
                tracing::error!(error = %e, kind = e.kind(), "Primary request failed");
                tracing::Span::current()
                    .record("status", StatusCode::INTERNAL_SERVER_ERROR.as_u16());
                relay::error_response(&e)
            }
        }
    }
    .instrument(span)
    .await
}

/// 400 for an inbound body that could not be buffered. Names the limit so it
/// reads differently from anything the primary could return.
fn body_rejected(max_body_bytes: usize) -> Response {
    (
        StatusCode::BAD_REQUEST,
        format!("httpdup: request body unreadable or larger than {max_body_bytes} bytes\n"),
    )
        .into_response()
}

/// Wait for SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
