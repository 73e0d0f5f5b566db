use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::stats::{percentage, ResponseTimeStats};

// ==================================================================================================
// Timing Records
// ==================================================================================================

/// Outcome of one dispatched request
///
/// `success` means the transport completed and the body was drained; the HTTP
/// status is recorded but not classified here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub success: bool,
    /// Wall-clock seconds from dispatch to body drained (or to the failure point)
    pub response_time: f64,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    /// UNIX seconds at dispatch
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

impl TimingRecord {
    pub fn success(response_time: f64, status_code: u16, timestamp: f64) -> Self {
        Self {
            success: true,
            response_time,
            status_code: Some(status_code),
            error: None,
            timestamp,
            request_id: None,
        }
    }

    pub fn failure(response_time: f64, error: impl Into<String>, timestamp: f64) -> Self {
        Self {
            success: false,
            response_time,
            status_code: None,
            error: Some(error.into()),
            timestamp,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: Option<u64>) -> Self {
        self.request_id = request_id;
        self
    }
}

// ==================================================================================================
// Per-Endpoint Metrics
// ==================================================================================================

/// Metrics for one load driver run of one endpoint (optionally at one block index)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub endpoint: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_response_time: f64,
    pub min_response_time: f64,
    pub max_response_time: f64,
    pub p95_response_time: f64,
    pub p99_response_time: f64,
    /// Successful requests per second over the measurement window
    pub throughput: f64,
    pub success_rate: f64,
    pub error_rate: f64,
    pub errors: BTreeSet<String>,
    pub block_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub individual_timings: Option<Vec<TimingRecord>>,
}

impl PerformanceMetrics {
    /// Reduce the timing records of one measurement phase
    ///
    /// Rates are computed over `timings.len()`, which the load driver guarantees to
    /// equal the number of dispatched requests. `keep_timings` attaches the raw
    /// records for verbose reports.
    pub fn from_timings(
        endpoint: &str,
        block_index: Option<i64>,
        timings: Vec<TimingRecord>,
        window: Duration,
        keep_timings: bool,
    ) -> Self {
        let total_requests = timings.len() as u64;
        let successful: Vec<f64> = timings
            .iter()
            .filter(|t| t.success)
            .map(|t| t.response_time)
            .collect();
        let successful_requests = successful.len() as u64;
        let failed_requests = total_requests - successful_requests;

        let errors: BTreeSet<String> = timings
            .iter()
            .filter(|t| !t.success)
            .filter_map(|t| t.error.clone())
            .collect();

        let stats = ResponseTimeStats::from_samples(&successful);
        let window_secs = window.as_secs_f64();
        let throughput = if window_secs > 0.0 {
            successful_requests as f64 / window_secs
        } else {
            0.0
        };

        Self {
            endpoint: endpoint.to_string(),
            total_requests,
            successful_requests,
            failed_requests,
            avg_response_time: stats.avg,
            min_response_time: stats.min,
            max_response_time: stats.max,
            p95_response_time: stats.p95,
            p99_response_time: stats.p99,
            throughput,
            success_rate: percentage(successful_requests, total_requests),
            error_rate: percentage(failed_requests, total_requests),
            errors,
            block_index,
            individual_timings: keep_timings.then_some(timings),
        }
    }
}

// ==================================================================================================
// Block-Range Roll-up
// ==================================================================================================

/// Roll-up of per-block metrics for a block-indexed endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub endpoint: String,
    pub block_range: Option<(i64, i64)>,
    pub total_blocks_tested: usize,
    pub total_requests_all_blocks: u64,
    pub successful_requests_all_blocks: u64,
    pub failed_requests_all_blocks: u64,
    pub avg_response_time_all_blocks: f64,
    pub min_response_time_all_blocks: f64,
    pub max_response_time_all_blocks: f64,
    pub throughput_all_blocks: f64,
    pub success_rate_all_blocks: f64,
    pub error_rate_all_blocks: f64,
    pub block_metrics: Vec<PerformanceMetrics>,
}

// ==================================================================================================
// Report Entries
// ==================================================================================================

/// Result recorded for one configured endpoint
///
/// Serialized untagged, so each entry is either a flat metrics object or an
/// aggregated object with a `block_metrics` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EndpointResult {
    Aggregated(AggregatedMetrics),
    Single(PerformanceMetrics),
}

impl EndpointResult {
    pub fn endpoint(&self) -> &str {
        match self {
            EndpointResult::Single(m) => &m.endpoint,
            EndpointResult::Aggregated(a) => &a.endpoint,
        }
    }

    pub fn total_requests(&self) -> u64 {
        match self {
            EndpointResult::Single(m) => m.total_requests,
            EndpointResult::Aggregated(a) => a.total_requests_all_blocks,
        }
    }

    pub fn successful_requests(&self) -> u64 {
        match self {
            EndpointResult::Single(m) => m.successful_requests,
            EndpointResult::Aggregated(a) => a.successful_requests_all_blocks,
        }
    }

    pub fn success_rate(&self) -> f64 {
        match self {
            EndpointResult::Single(m) => m.success_rate,
            EndpointResult::Aggregated(a) => a.success_rate_all_blocks,
        }
    }

    pub fn throughput(&self) -> f64 {
        match self {
            EndpointResult::Single(m) => m.throughput,
            EndpointResult::Aggregated(a) => a.throughput_all_blocks,
        }
    }

    pub fn avg_response_time(&self) -> f64 {
        match self {
            EndpointResult::Single(m) => m.avg_response_time,
            EndpointResult::Aggregated(a) => a.avg_response_time_all_blocks,
        }
    }

    /// Drop raw per-request timings from this entry and any nested block metrics
    pub fn strip_timings(&mut self) {
        match self {
            EndpointResult::Single(m) => m.individual_timings = None,
            EndpointResult::Aggregated(a) => a
                .block_metrics
                .iter_mut()
                .for_each(|m| m.individual_timings = None),
        }
    }
}

impl From<PerformanceMetrics> for EndpointResult {
    fn from(metrics: PerformanceMetrics) -> Self {
        EndpointResult::Single(metrics)
    }
}

impl From<AggregatedMetrics> for EndpointResult {
    fn from(metrics: AggregatedMetrics) -> Self {
        EndpointResult::Aggregated(metrics)
    }
}
