//! Single-request execution with wall-clock timing.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RunSettings;
use crate::error::Result;
use crate::models::{EndpointDefinition, TimingRecord};

/// Issues one request and reports how it went
///
/// Implementations never fail: every transport problem becomes a
/// `TimingRecord` with `success = false`.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, endpoint: &EndpointDefinition, request_id: Option<u64>)
        -> TimingRecord;
}

/// Builds executors; each call yields an executor with its own connection pool
pub trait ExecutorFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn RequestExecutor>>;
}

impl<F> ExecutorFactory for F
where
    F: Fn() -> Result<Arc<dyn RequestExecutor>> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn RequestExecutor>> {
        self()
    }
}

/// UNIX time in fractional seconds
pub fn unix_timestamp() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

// ==================================================================================================
// HTTP Executor
// ==================================================================================================

/// reqwest-backed executor; one instance owns one connection pool
pub struct HttpExecutor {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpExecutor {
    /// Create an executor with a fresh connection pool
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
        })
    }

    /// Send the request and drain the body; returns the status code
    async fn send(&self, endpoint: &EndpointDefinition) -> std::result::Result<u16, String> {
        let method = endpoint
            .http_method()
            .ok_or_else(|| format!("Invalid HTTP method: {}", endpoint.method))?;
        let url = format!("{}{}", self.base_url, endpoint.path);

        // An endpoint without a payload still sends an empty JSON object
        let empty = Value::Object(Map::new());
        let payload = endpoint.payload.as_ref().unwrap_or(&empty);

        let response = self
            .client
            .request(method, &url)
            .json(payload)
            .send()
            .await
            .map_err(|e| describe_error(&e, self.timeout))?;
        let status = response.status().as_u16();

        // Drain the full body so timing covers the transfer, not just the headers
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            chunk.map_err(|e| {
                if e.is_timeout() {
                    describe_error(&e, self.timeout)
                } else {
                    format!("Body read error: {}", error_chain(&e))
                }
            })?;
        }

        Ok(status)
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(
        &self,
        endpoint: &EndpointDefinition,
        request_id: Option<u64>,
    ) -> TimingRecord {
        let timestamp = unix_timestamp();
        let start = Instant::now();

        let outcome = self.send(endpoint).await;
        let elapsed = start.elapsed().as_secs_f64();

        let record = match outcome {
            Ok(status) => TimingRecord::success(elapsed, status, timestamp),
            Err(error) => {
                tracing::debug!(endpoint = %endpoint.path, error = %error, "Request failed");
                TimingRecord::failure(elapsed, error, timestamp)
            }
        };
        record.with_request_id(request_id)
    }
}

/// Factory producing [`HttpExecutor`]s for the configured target
#[derive(Debug, Clone)]
pub struct HttpExecutorFactory {
    base_url: String,
    timeout: Duration,
}

impl HttpExecutorFactory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn from_settings(settings: &RunSettings) -> Self {
        Self::new(settings.base_url.clone(), settings.timeout())
    }
}

impl ExecutorFactory for HttpExecutorFactory {
    fn create(&self) -> Result<Arc<dyn RequestExecutor>> {
        Ok(Arc::new(HttpExecutor::new(
            self.base_url.clone(),
            self.timeout,
        )?))
    }
}

// ==================================================================================================
// Error Formatting
// ==================================================================================================

/// Human-readable cause, stable across requests so identical failures deduplicate
fn describe_error(error: &reqwest::Error, timeout: Duration) -> String {
    if error.is_timeout() {
        format!("Timeout after {}s", timeout.as_secs_f64())
    } else if error.is_connect() {
        format!("Connection error: {}", root_cause(error))
    } else {
        error_chain(error)
    }
}

fn root_cause(error: &(dyn StdError + 'static)) -> String {
    let mut current = error;
    while let Some(source) = current.source() {
        current = source;
    }
    current.to_string()
}

fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut current = error.source();
    while let Some(source) = current {
        message.push_str(": ");
        message.push_str(&source.to_string());
        current = source.source();
    }
    message
}
