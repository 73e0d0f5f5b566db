//! Mock HTTP target that answers every path with a streamed JSON body.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use bytes::Bytes;
use rand::Rng;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Configuration for the mock target
#[derive(Debug, Clone)]
pub struct MockServerConfig {
    /// Port to listen on (0 for random)
    pub port: u16,
    /// Delay before the response headers are sent, in milliseconds
    pub latency_ms: u64,
    /// Number of body chunks streamed after the headers
    pub chunk_count: usize,
    /// Delay between body chunks in milliseconds
    pub chunk_latency_ms: u64,
    /// Fraction of requests answered with HTTP 500 (0.0 to 1.0)
    pub error_rate: f64,
    /// Fraction of requests that never answer (0.0 to 1.0)
    pub stall_rate: f64,
}

impl Default for MockServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            latency_ms: 20,
            chunk_count: 4,
            chunk_latency_ms: 0,
            error_rate: 0.0,
            stall_rate: 0.0,
        }
    }
}

/// Counters shared between the server task and its owner
#[derive(Default)]
struct MockState {
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    requests: AtomicU64,
    bodies: Mutex<Vec<Value>>,
}

/// Decrements the in-flight gauge when the response finishes or is abandoned
struct InFlightGuard(Arc<MockState>);

impl InFlightGuard {
    fn enter(state: &Arc<MockState>) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(state.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<MockServerConfig>,
    stats: Arc<MockState>,
}

/// Mock target server for self-contained runs
pub struct MockServer {
    config: MockServerConfig,
    stats: Arc<MockState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    port: u16,
}

impl MockServer {
    /// Create a new mock server with the given configuration
    pub fn new(config: MockServerConfig) -> Self {
        Self {
            config,
            stats: Arc::new(MockState::default()),
            shutdown_tx: None,
            port: 0,
        }
    }

    /// Start the mock server and return the actual port
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("127.0.0.1:{}", self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();
        self.port = port;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let app = Router::new().fallback(handle_any).with_state(AppState {
            config: Arc::new(self.config.clone()),
            stats: self.stats.clone(),
        });

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        tracing::debug!(port, "Mock server listening");
        Ok(port)
    }

    /// Get the server's URL
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Highest number of requests observed in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.stats.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Total requests received
    pub fn requests_received(&self) -> u64 {
        self.stats.requests.load(Ordering::SeqCst)
    }

    /// JSON bodies received, in arrival order
    pub fn received_bodies(&self) -> Vec<Value> {
        self.stats
            .bodies
            .lock()
            .map(|bodies| bodies.clone())
            .unwrap_or_default()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Answer any method on any path
async fn handle_any(State(state): State<AppState>, body: Bytes) -> Response {
    let guard = InFlightGuard::enter(&state.stats);
    state.stats.requests.fetch_add(1, Ordering::SeqCst);

    if let Ok(json) = serde_json::from_slice::<Value>(&body) {
        if let Ok(mut bodies) = state.stats.bodies.lock() {
            bodies.push(json);
        }
    }

    let config = state.config;
    let (stall, fail) = {
        let mut rng = rand::thread_rng();
        (
            config.stall_rate > 0.0 && rng.gen::<f64>() < config.stall_rate,
            config.error_rate > 0.0 && rng.gen::<f64>() < config.error_rate,
        )
    };

    if stall {
        // Hold the connection until the client gives up
        futures::future::pending::<()>().await;
    }

    if config.latency_ms > 0 {
        tokio::time::sleep(Duration::from_millis(config.latency_ms)).await;
    }

    if fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Simulated error").into_response();
    }

    let stream = generate_stream(config, guard);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Stream a JSON array in `chunk_count` pieces; the guard lives until the last chunk
fn generate_stream(
    config: Arc<MockServerConfig>,
    guard: InFlightGuard,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> {
    async_stream::stream! {
        let _guard = guard;
        let chunk_latency = Duration::from_millis(config.chunk_latency_ms);

        yield Ok(Bytes::from_static(b"["));
        for i in 0..config.chunk_count {
            if !chunk_latency.is_zero() {
                tokio::time::sleep(chunk_latency).await;
            }
            let separator = if i == 0 { "" } else { "," };
            let chunk = serde_json::json!({"chunk": i, "data": "x".repeat(64)});
            yield Ok(Bytes::from(format!("{}{}", separator, chunk)));
        }
        yield Ok(Bytes::from_static(b"]"));
    }
}
