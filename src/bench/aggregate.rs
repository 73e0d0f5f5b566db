//! Roll-up of per-block metrics into one record per endpoint.

use crate::models::{AggregatedMetrics, PerformanceMetrics};
use crate::stats::{mean, percentage};

/// Reduce an ordered sequence of per-block metrics
///
/// Totals are exact sums over `block_metrics`. The average response time is the
/// mean of block averages weighted by each block's successful-request count; the
/// minimum ignores blocks without a positive minimum (no successes). Throughput is
/// the unweighted mean of block throughputs.
pub fn aggregate(
    endpoint: &str,
    block_range: Option<(i64, i64)>,
    block_metrics: Vec<PerformanceMetrics>,
) -> AggregatedMetrics {
    let total_requests: u64 = block_metrics.iter().map(|m| m.total_requests).sum();
    let successful_requests: u64 = block_metrics.iter().map(|m| m.successful_requests).sum();
    let failed_requests: u64 = block_metrics.iter().map(|m| m.failed_requests).sum();

    let (weighted_sum, weight) = block_metrics
        .iter()
        .filter(|m| m.avg_response_time > 0.0 && m.successful_requests > 0)
        .fold((0.0, 0u64), |(sum, weight), m| {
            (
                sum + m.avg_response_time * m.successful_requests as f64,
                weight + m.successful_requests,
            )
        });
    let avg_response_time = if weight > 0 {
        weighted_sum / weight as f64
    } else {
        0.0
    };

    let min_response_time = block_metrics
        .iter()
        .map(|m| m.min_response_time)
        .filter(|&min| min > 0.0)
        .min_by(f64::total_cmp)
        .unwrap_or(0.0);
    let max_response_time = block_metrics
        .iter()
        .map(|m| m.max_response_time)
        .max_by(f64::total_cmp)
        .unwrap_or(0.0);

    let throughputs: Vec<f64> = block_metrics.iter().map(|m| m.throughput).collect();

    AggregatedMetrics {
        endpoint: endpoint.to_string(),
        block_range,
        total_blocks_tested: block_metrics.len(),
        total_requests_all_blocks: total_requests,
        successful_requests_all_blocks: successful_requests,
        failed_requests_all_blocks: failed_requests,
        avg_response_time_all_blocks: avg_response_time,
        min_response_time_all_blocks: min_response_time,
        max_response_time_all_blocks: max_response_time,
        throughput_all_blocks: mean(&throughputs),
        success_rate_all_blocks: percentage(successful_requests, total_requests),
        error_rate_all_blocks: percentage(failed_requests, total_requests),
        block_metrics,
    }
}
