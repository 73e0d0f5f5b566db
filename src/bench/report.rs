//! Report generation for performance test results.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::RunSettings;
use crate::error::Result;
use crate::models::{AggregatedMetrics, EndpointDefinition, EndpointResult, PerformanceMetrics};
use crate::stats::{mean, percentage};

/// Complete performance report, as persisted for external tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub test_summary: TestSummary,
    /// One entry per endpoint, in processing order
    pub results: Vec<EndpointResult>,
}

/// Run parameters echoed into the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSummary {
    pub test_name: String,
    pub total_endpoints: usize,
    pub concurrent_requests: usize,
    pub total_requests_per_endpoint: usize,
    pub timeout_seconds: f64,
}

/// Cross-endpoint roll-up for console output only
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub overall_success_rate: f64,
    pub average_throughput: f64,
    /// Mean of endpoint averages, skipping endpoints without a positive average
    pub average_response_time: f64,
}

impl Report {
    /// Build the report; raw timings are stripped unless the run is verbose
    pub fn new(settings: &RunSettings, mut results: Vec<EndpointResult>) -> Self {
        if !settings.verbose {
            results.iter_mut().for_each(EndpointResult::strip_timings);
        }

        Self {
            test_summary: TestSummary {
                test_name: settings.test_name.clone(),
                total_endpoints: results.len(),
                concurrent_requests: settings.concurrent_requests,
                total_requests_per_endpoint: settings.total_requests,
                timeout_seconds: settings.timeout_seconds,
            },
            results,
        }
    }

    /// Compute the cross-endpoint summary
    pub fn summary(&self) -> RunSummary {
        let total_requests: u64 = self.results.iter().map(EndpointResult::total_requests).sum();
        let total_successful: u64 = self
            .results
            .iter()
            .map(EndpointResult::successful_requests)
            .sum();
        let throughputs: Vec<f64> = self.results.iter().map(EndpointResult::throughput).collect();
        let response_times: Vec<f64> = self
            .results
            .iter()
            .map(EndpointResult::avg_response_time)
            .filter(|&t| t > 0.0)
            .collect();

        RunSummary {
            overall_success_rate: percentage(total_successful, total_requests),
            average_throughput: mean(&throughputs),
            average_response_time: mean(&response_times),
        }
    }

    /// Export the report as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report, creating parent directories as needed
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json()?)?;
        tracing::debug!(path = %path.display(), "Report written");
        Ok(())
    }

    /// Load a previously written report
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Print the summary block and the per-endpoint table
    pub fn print_summary(&self) {
        let summary = self.summary();

        println!("\n{}", "=".repeat(80));
        println!("SUMMARY REPORT");
        println!("{}", "=".repeat(80));
        println!("Overall Success Rate: {:.2}%", summary.overall_success_rate);
        println!("Average Throughput: {:.2} req/sec", summary.average_throughput);
        println!(
            "Average Response Time: {:.2}ms",
            summary.average_response_time * 1000.0
        );

        println!("\nEndpoint Performance Summary:");
        for result in &self.results {
            println!(
                "  {:<20} | Success: {:6.2}% | Avg RT: {:7.2}ms | Throughput: {:6.2} req/sec",
                result.endpoint(),
                result.success_rate(),
                result.avg_response_time() * 1000.0,
                result.throughput()
            );
        }
    }
}

/// Default report location: `results/<YYYYmmdd-HHMMSS>.json`
pub fn default_output_path() -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    PathBuf::from("results").join(format!("{}.json", timestamp))
}

/// Print the banner that precedes each endpoint
pub fn print_endpoint_header(endpoint: &EndpointDefinition) {
    println!("\n{}", "=".repeat(60));
    println!("Testing endpoint: {}", endpoint.path);
    println!("{}", "=".repeat(60));
}

/// Print one load driver result
pub fn print_metrics(metrics: &PerformanceMetrics) {
    let block_info = metrics
        .block_index
        .map(|index| format!(" (Block {})", index))
        .unwrap_or_default();

    println!(
        "\nPerformance Results for {}{}:",
        metrics.endpoint, block_info
    );
    println!("  Total Requests: {}", metrics.total_requests);
    println!("  Successful: {}", metrics.successful_requests);
    println!("  Failed: {}", metrics.failed_requests);
    println!("  Success Rate: {:.2}%", metrics.success_rate);
    println!("  Error Rate: {:.2}%", metrics.error_rate);
    println!(
        "  Average Response Time: {:.2}ms",
        metrics.avg_response_time * 1000.0
    );
    println!(
        "  Min Response Time: {:.2}ms",
        metrics.min_response_time * 1000.0
    );
    println!(
        "  Max Response Time: {:.2}ms",
        metrics.max_response_time * 1000.0
    );
    println!(
        "  95th Percentile: {:.2}ms",
        metrics.p95_response_time * 1000.0
    );
    println!(
        "  99th Percentile: {:.2}ms",
        metrics.p99_response_time * 1000.0
    );
    println!("  Throughput: {:.2} req/sec", metrics.throughput);

    if !metrics.errors.is_empty() {
        println!("  Errors encountered:");
        for error in &metrics.errors {
            println!("    - {}", error);
        }
    }
}

/// Print a block-range roll-up
pub fn print_aggregated(aggregated: &AggregatedMetrics) {
    println!("\n{}", "=".repeat(40));
    println!("AGGREGATED RESULTS for {}", aggregated.endpoint);
    if let Some((start, end)) = aggregated.block_range {
        println!("Block Range: {} to {}", start, end);
    }
    println!("Total Blocks Tested: {}", aggregated.total_blocks_tested);
    println!("{}", "=".repeat(40));
    println!(
        "  Total Requests (all blocks): {}",
        aggregated.total_requests_all_blocks
    );
    println!(
        "  Successful (all blocks): {}",
        aggregated.successful_requests_all_blocks
    );
    println!(
        "  Failed (all blocks): {}",
        aggregated.failed_requests_all_blocks
    );
    println!(
        "  Overall Success Rate: {:.2}%",
        aggregated.success_rate_all_blocks
    );
    println!(
        "  Overall Error Rate: {:.2}%",
        aggregated.error_rate_all_blocks
    );
    println!(
        "  Average Response Time: {:.2}ms",
        aggregated.avg_response_time_all_blocks * 1000.0
    );
    println!(
        "  Min Response Time: {:.2}ms",
        aggregated.min_response_time_all_blocks * 1000.0
    );
    println!(
        "  Max Response Time: {:.2}ms",
        aggregated.max_response_time_all_blocks * 1000.0
    );
    println!(
        "  Average Throughput: {:.2} req/sec",
        aggregated.throughput_all_blocks
    );
}
