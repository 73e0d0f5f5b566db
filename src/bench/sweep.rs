//! Block-range sweeps for block-indexed endpoints.

use super::aggregate::aggregate;
use super::driver::LoadDriver;
use super::report;
use crate::error::Result;
use crate::models::{AggregatedMetrics, EndpointDefinition};

/// Repeats the load driver across an inclusive block range
pub struct BlockRangeSweeper<'a> {
    driver: &'a LoadDriver,
}

impl<'a> BlockRangeSweeper<'a> {
    pub fn new(driver: &'a LoadDriver) -> Self {
        Self { driver }
    }

    /// Test every block in `[block_start, block_end]`, strictly one after another
    ///
    /// Each block's warm-up and measurement finish before the next block starts.
    pub async fn sweep(
        &self,
        endpoint: &EndpointDefinition,
        block_start: i64,
        block_end: i64,
    ) -> Result<AggregatedMetrics> {
        tracing::info!("Using block range: {} to {}", block_start, block_end);

        let mut block_metrics = Vec::new();

        for block_index in block_start..=block_end {
            let metrics = self.driver.run(endpoint, Some(block_index)).await?;
            tracing::debug!(
                endpoint = %endpoint.path,
                block_index,
                successful = metrics.successful_requests,
                failed = metrics.failed_requests,
                "Block complete"
            );
            report::print_metrics(&metrics);
            block_metrics.push(metrics);
        }

        Ok(aggregate(
            &endpoint.path,
            Some((block_start, block_end)),
            block_metrics,
        ))
    }
}
