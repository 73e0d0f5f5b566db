//! Instrumented executors for engine tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::executor::{ExecutorFactory, RequestExecutor};
use crate::error::Result;
use crate::models::{EndpointDefinition, TimingRecord};

/// Factory handing out the same executor for every pool
pub fn factory_for<E: RequestExecutor + 'static>(executor: Arc<E>) -> Arc<dyn ExecutorFactory> {
    Arc::new(move || -> Result<Arc<dyn RequestExecutor>> {
        let executor: Arc<dyn RequestExecutor> = executor.clone();
        Ok(executor)
    })
}

/// Succeeds after a fixed delay while tracking concurrency and inputs
pub struct GaugeExecutor {
    delay: Duration,
    panic_on_call: Option<usize>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    payloads: Mutex<Vec<Value>>,
    started_ids: Mutex<Vec<Option<u64>>>,
}

impl GaugeExecutor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            panic_on_call: None,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
            started_ids: Mutex::new(Vec::new()),
        }
    }

    /// Panic on the n-th call (0-based)
    pub fn panic_on(mut self, call: usize) -> Self {
        self.panic_on_call = Some(call);
        self
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<Value> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn started_ids(&self) -> Vec<Option<u64>> {
        self.started_ids.lock().unwrap().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RequestExecutor for GaugeExecutor {
    async fn execute(
        &self,
        endpoint: &EndpointDefinition,
        request_id: Option<u64>,
    ) -> TimingRecord {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(payload) = &endpoint.payload {
            self.payloads.lock().unwrap().push(payload.clone());
        }
        self.started_ids.lock().unwrap().push(request_id);

        if self.panic_on_call == Some(call) {
            panic!("executor exploded on call {}", call);
        }

        let start = std::time::Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        TimingRecord::success(start.elapsed().as_secs_f64(), 200, 0.0).with_request_id(request_id)
    }
}

/// Replays a fixed list of records in call order, then succeeds instantly
pub struct ScriptedExecutor {
    script: Mutex<VecDeque<TimingRecord>>,
}

impl ScriptedExecutor {
    pub fn new(records: Vec<TimingRecord>) -> Self {
        Self {
            script: Mutex::new(records.into()),
        }
    }
}

#[async_trait]
impl RequestExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        _endpoint: &EndpointDefinition,
        request_id: Option<u64>,
    ) -> TimingRecord {
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| TimingRecord::success(0.001, 200, 0.0))
            .with_request_id(request_id)
    }
}
