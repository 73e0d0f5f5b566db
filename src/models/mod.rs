// Data models for endpoints, timings and metrics

pub mod endpoint;
pub mod metrics;

pub use endpoint::EndpointDefinition;
pub use metrics::{AggregatedMetrics, EndpointResult, PerformanceMetrics, TimingRecord};
