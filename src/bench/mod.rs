//! Performance testing engine.
//!
//! This module provides the pieces of a run:
//! - Request executor with wall-clock timing
//! - Load driver (warm-up, then semaphore-bounded measurement)
//! - Block-range sweeper and per-block aggregation
//! - Run orchestrator and JSON report
//! - Mock target server for self-contained runs and tests

pub mod aggregate;
pub mod driver;
pub mod executor;
pub mod mock_server;
pub mod orchestrator;
pub mod report;
pub mod sweep;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregate::aggregate;
pub use driver::LoadDriver;
pub use executor::{ExecutorFactory, HttpExecutor, HttpExecutorFactory, RequestExecutor};
pub use mock_server::{MockServer, MockServerConfig};
pub use orchestrator::RunOrchestrator;
pub use report::{Report, RunSummary, TestSummary};
pub use sweep::BlockRangeSweeper;
