//! Runs every configured endpoint and assembles the report.

use std::sync::Arc;

use super::driver::LoadDriver;
use super::executor::{ExecutorFactory, HttpExecutorFactory};
use super::report::{self, Report};
use super::sweep::BlockRangeSweeper;
use crate::config::TestConfig;
use crate::error::Result;
use crate::models::{EndpointDefinition, EndpointResult};

/// Sequential runner over all configured endpoints
pub struct RunOrchestrator {
    config: TestConfig,
    driver: LoadDriver,
}

impl RunOrchestrator {
    /// Create an orchestrator that talks HTTP to the configured base URL
    pub fn new(config: TestConfig) -> Self {
        let factory = Arc::new(HttpExecutorFactory::from_settings(&config.settings));
        Self::with_factory(config, factory)
    }

    /// Create an orchestrator with a custom executor factory
    pub fn with_factory(config: TestConfig, factory: Arc<dyn ExecutorFactory>) -> Self {
        let driver = LoadDriver::new(config.settings.clone(), factory);
        Self { config, driver }
    }

    /// Test every endpoint in declaration order
    ///
    /// Endpoints never overlap: each one finishes (including every block of a
    /// sweep) before the next starts.
    pub async fn run_all(&self) -> Result<Report> {
        let mut results = Vec::with_capacity(self.config.endpoints.len());

        for endpoint in &self.config.endpoints {
            report::print_endpoint_header(endpoint);
            results.push(self.run_endpoint(endpoint).await?);
        }

        tracing::info!("Completed {} endpoint(s)", results.len());
        Ok(Report::new(&self.config.settings, results))
    }

    async fn run_endpoint(&self, endpoint: &EndpointDefinition) -> Result<EndpointResult> {
        match self.config.settings.block_range() {
            Some((start, end)) if endpoint.uses_block_index => {
                let aggregated = BlockRangeSweeper::new(&self.driver)
                    .sweep(endpoint, start, end)
                    .await?;
                report::print_aggregated(&aggregated);
                Ok(aggregated.into())
            }
            _ => {
                let metrics = self.driver.run(endpoint, None).await?;
                report::print_metrics(&metrics);
                Ok(metrics.into())
            }
        }
    }
}
