//! Shared helpers for duplicator integration tests: recording backends and a
//! duplicator bound to an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::Router;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, Mutex};

use httpdup::config::DuplicatorConfig;
use httpdup::proxy::dispatcher::DuplicationDispatcher;
use httpdup::server::{self, AppState};
use httpdup::stats::DuplicatorStats;

/// A request as seen by a test backend.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// What a test backend answers with.
#[derive(Clone)]
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: &'static str,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: &'static str) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body,
            delay: Duration::ZERO,
        }
    }

    /// Answers only after `delay`.
    pub fn hanging(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::ok("late")
        }
    }
}

#[derive(Clone)]
struct BackendState {
    reply: Reply,
    seen: mpsc::UnboundedSender<Recorded>,
}

/// A running backend and the stream of requests it received.
pub struct Backend {
    pub addr: SocketAddr,
    seen: Mutex<mpsc::UnboundedReceiver<Recorded>>,
}

impl Backend {
    /// Next request this backend received, waiting up to five seconds.
    pub async fn next_request(&self) -> Recorded {
        let mut seen = self.seen.lock().await;
        tokio::time::timeout(Duration::from_secs(5), seen.recv())
            .await
            .expect("backend received no request in time")
            .expect("backend channel closed")
    }

    /// Requests received so far, without waiting.
    pub async fn drain_requests(&self) -> Vec<Recorded> {
        let mut seen = self.seen.lock().await;
        let mut all = Vec::new();
        while let Ok(r) = seen.try_recv() {
            all.push(r);
        }
        all
    }
}

async fn record_and_reply(State(state): State<BackendState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.unwrap_or_default();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let _ = state.seen.send(Recorded {
        method: parts.method.to_string(),
        path_and_query,
        headers: parts.headers,
        body,
    });

    if !state.reply.delay.is_zero() {
        tokio::time::sleep(state.reply.delay).await;
    }

    let mut builder = Response::builder().status(StatusCode::from_u16(state.reply.status).unwrap());
    for (name, value) in &state.reply.headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(state.reply.body)).unwrap()
}

/// Start a backend on an ephemeral port that records every request.
pub async fn start_backend(reply: Reply) -> Arc<Backend> {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    let app = Router::new()
        .fallback(record_and_reply)
        .with_state(BackendState { reply, seen: tx });
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Arc::new(Backend {
        addr,
        seen: Mutex::new(rx),
    })
}

/// An address with nothing listening on it.
pub fn dead_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().to_string()
}

/// A duplicator serving on an ephemeral port.
pub struct Duplicator {
    pub addr: SocketAddr,
    pub stats: DuplicatorStats,
    pub dispatcher: DuplicationDispatcher,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl Duplicator {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Trigger graceful shutdown and wait for the server (and mirror drain).
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = tokio::time::timeout(Duration::from_secs(15), &mut self.handle).await;
    }
}

/// Start a duplicator with `primary` and `mirrors`; `tweak` adjusts the rest.
pub async fn start_duplicator(
    primary: &str,
    mirrors: &[String],
    tweak: impl FnOnce(&mut DuplicatorConfig),
) -> Duplicator {
    let mut config = DuplicatorConfig::default();
    config.server.listen_address = "127.0.0.1:0".to_string();
    config.primary.address = primary.to_string();
    config.mirror.addresses = mirrors.to_vec();
    config.primary.timeout_secs = 5;
    config.mirror.timeout_secs = 5;
    config.mirror.drain_timeout_secs = 1;
    tweak(&mut config);

    let destinations = config.destinations().unwrap();
    let stats = DuplicatorStats::new();
    let dispatcher = DuplicationDispatcher::from_config(&config, destinations, stats.clone()).unwrap();

    let listener = TcpListener::bind(&config.server.listen_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState {
        config: Arc::new(config),
        dispatcher: dispatcher.clone(),
        stats: stats.clone(),
    };

    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(server::serve(listener, state, async move {
        let _ = rx.await;
    }));

    Duplicator {
        addr,
        stats,
        dispatcher,
        shutdown: Some(tx),
        handle,
    }
}

/// Test client: no proxy, no redirects, no pooling.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Send `GET <target>` over a raw connection so the request target reaches
/// the duplicator exactly as written. Returns the raw response.
pub async fn raw_get(addr: SocketAddr, target: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {target} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut response))
        .await
        .expect("duplicator did not answer in time")
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}
