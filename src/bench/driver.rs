//! Load driver: warm-up followed by a bounded-concurrency measurement run.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use super::executor::{unix_timestamp, ExecutorFactory, RequestExecutor};
use crate::config::RunSettings;
use crate::error::{PerfError, Result};
use crate::models::{EndpointDefinition, PerformanceMetrics, TimingRecord};

/// Drives one endpoint through warm-up and measurement
pub struct LoadDriver {
    settings: RunSettings,
    factory: Arc<dyn ExecutorFactory>,
}

impl LoadDriver {
    /// Create a new load driver
    pub fn new(settings: RunSettings, factory: Arc<dyn ExecutorFactory>) -> Self {
        Self { settings, factory }
    }

    /// Run one endpoint, optionally targeting a block index
    ///
    /// Individual request failures never abort the run: the returned metrics always
    /// account for exactly `total_requests` dispatched requests.
    pub async fn run(
        &self,
        endpoint: &EndpointDefinition,
        block_index: Option<i64>,
    ) -> Result<PerformanceMetrics> {
        let target = Arc::new(match block_index {
            Some(index) => endpoint.for_block(index),
            None => endpoint.clone(),
        });

        match block_index {
            Some(index) => tracing::info!(
                "Testing {} - Block {} - {} requests with {} concurrent",
                endpoint.path,
                index,
                self.settings.total_requests,
                self.settings.concurrent_requests
            ),
            None => tracing::info!(
                "Testing {} - {} requests with {} concurrent",
                endpoint.path,
                self.settings.total_requests,
                self.settings.concurrent_requests
            ),
        }

        self.warmup(&target).await?;
        let (timings, window) = self.measure(&target).await?;

        let metrics = PerformanceMetrics::from_timings(
            &endpoint.path,
            block_index,
            timings,
            window,
            self.settings.verbose,
        );

        if metrics.total_requests > 0 && metrics.successful_requests == 0 {
            tracing::warn!(
                endpoint = %endpoint.path,
                block_index = ?block_index,
                "Every request failed"
            );
        }

        Ok(metrics)
    }

    /// Prime connections on a fresh pool; results are discarded
    async fn warmup(&self, endpoint: &EndpointDefinition) -> Result<()> {
        let count = self.settings.warm_up_requests;
        if count == 0 {
            return Ok(());
        }

        tracing::info!("Warming up {} with {} requests...", endpoint.path, count);

        let executor = self.factory.create()?;
        let requests = (0..count).map(|_| executor.execute(endpoint, None));
        futures::future::join_all(requests).await;

        Ok(())
    }

    /// Dispatch every measured request through the admission semaphore
    ///
    /// Permits are taken before each task is spawned, so admission follows
    /// submission order and at most `concurrent_requests` tasks are in flight.
    async fn measure(
        &self,
        endpoint: &Arc<EndpointDefinition>,
    ) -> Result<(Vec<TimingRecord>, Duration)> {
        let total = self.settings.total_requests;
        let slots = self.settings.concurrent_requests;
        if slots > Semaphore::MAX_PERMITS {
            return Err(PerfError::Scheduler(format!(
                "{} concurrent requests exceeds the limit of {}",
                slots,
                Semaphore::MAX_PERMITS
            )));
        }

        let executor: Arc<dyn RequestExecutor> = self.factory.create()?;
        let semaphore = Arc::new(Semaphore::new(slots));

        let start = Instant::now();
        let mut handles = Vec::new();

        for request_id in 0..total as u64 {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| PerfError::Scheduler(e.to_string()))?;
            let executor = executor.clone();
            let endpoint = endpoint.clone();
            let tracked_id = self.settings.verbose.then_some(request_id);

            handles.push(tokio::spawn(async move {
                let record = executor.execute(&endpoint, tracked_id).await;
                drop(permit);
                record
            }));
        }

        // Wait for every request to reach a terminal state
        let mut timings = Vec::with_capacity(handles.len());
        for (request_id, handle) in handles.into_iter().enumerate() {
            let record = match handle.await {
                Ok(record) => record,
                Err(e) => {
                    tracing::debug!(request_id, error = %e, "Request task did not complete");
                    let tracked_id = self.settings.verbose.then_some(request_id as u64);
                    TimingRecord::failure(
                        0.0,
                        format!("Request task failed: {}", e),
                        unix_timestamp(),
                    )
                    .with_request_id(tracked_id)
                }
            };
            timings.push(record);
        }

        Ok((timings, start.elapsed()))
    }
}
