// mesh-perf - Library root for the engine and its tests

pub mod bench;
pub mod config;
pub mod error;
pub mod models;
pub mod payload;
pub mod stats;
