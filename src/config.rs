use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PerfError, Result};
use crate::models::EndpointDefinition;

/// Largest admission semaphore the runtime can create
pub const MAX_CONCURRENT_REQUESTS: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// Concurrent HTTP performance tester
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the test configuration file (YAML, JSON or TOML)
    #[arg(
        short,
        long,
        env = "MESH_PERF_CONFIG",
        default_value = "config/data-test-config.yml"
    )]
    pub config: PathBuf,

    /// Output file for the detailed JSON report (default: results/<timestamp>.json)
    #[arg(short, long, env = "MESH_PERF_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Keep individual request timings in the report
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the base URL from the configuration file
    #[arg(long, env = "MESH_PERF_BASE_URL")]
    pub base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Start the built-in mock target and run the configuration against it
    #[arg(long)]
    pub mock_server: bool,

    /// Response latency of the built-in mock target in milliseconds
    #[arg(long, default_value = "20")]
    pub mock_latency_ms: u64,
}

// ==================================================================================================
// File Schema
// ==================================================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct TestFile {
    #[serde(default = "default_test_name")]
    test_name: String,
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default)]
    performance: PerformanceSection,
    #[serde(default)]
    block_range: BlockRangeSection,
    #[serde(default)]
    endpoints: Vec<EndpointDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
struct PerformanceSection {
    concurrent_requests: usize,
    total_requests: usize,
    timeout_seconds: f64,
    warm_up_requests: usize,
}

impl Default for PerformanceSection {
    fn default() -> Self {
        Self {
            concurrent_requests: 10,
            total_requests: 100,
            timeout_seconds: 30.0,
            warm_up_requests: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct BlockRangeSection {
    enabled: bool,
    start: i64,
    end: i64,
}

impl Default for BlockRangeSection {
    fn default() -> Self {
        Self {
            enabled: false,
            start: 1,
            end: 1,
        }
    }
}

fn default_test_name() -> String {
    "performance-test".to_string()
}

fn default_base_url() -> String {
    "https://example.com".to_string()
}

// ==================================================================================================
// Run Settings
// ==================================================================================================

/// Global settings shared by every component of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub test_name: String,
    pub base_url: String,
    pub concurrent_requests: usize,
    pub total_requests: usize,
    pub timeout_seconds: f64,
    pub warm_up_requests: usize,
    pub block_range_enabled: bool,
    pub block_start: i64,
    pub block_end: i64,
    pub verbose: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        let performance = PerformanceSection::default();
        let block_range = BlockRangeSection::default();
        Self {
            test_name: default_test_name(),
            base_url: default_base_url(),
            concurrent_requests: performance.concurrent_requests,
            total_requests: performance.total_requests,
            timeout_seconds: performance.timeout_seconds,
            warm_up_requests: performance.warm_up_requests,
            block_range_enabled: block_range.enabled,
            block_start: block_range.start,
            block_end: block_range.end,
            verbose: false,
        }
    }
}

impl RunSettings {
    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds)
    }

    /// Inclusive block range, present only when block-range mode is enabled
    pub fn block_range(&self) -> Option<(i64, i64)> {
        self.block_range_enabled
            .then_some((self.block_start, self.block_end))
    }
}

/// A loaded test configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TestConfig {
    pub settings: RunSettings,
    pub endpoints: Vec<EndpointDefinition>,
}

impl TestConfig {
    /// Load and validate a configuration file
    ///
    /// The format is inferred from the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PerfError::ConfigNotFound(path.to_path_buf()));
        }

        let file: TestFile = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;

        let config = Self::from_file(file);
        config.validate()?;

        tracing::debug!(
            path = %path.display(),
            endpoints = config.endpoints.len(),
            "Loaded test configuration"
        );

        Ok(config)
    }

    fn from_file(file: TestFile) -> Self {
        Self {
            settings: RunSettings {
                test_name: file.test_name,
                base_url: normalize_base_url(&file.base_url),
                concurrent_requests: file.performance.concurrent_requests,
                total_requests: file.performance.total_requests,
                timeout_seconds: file.performance.timeout_seconds,
                warm_up_requests: file.performance.warm_up_requests,
                block_range_enabled: file.block_range.enabled,
                block_start: file.block_range.start,
                block_end: file.block_range.end,
                verbose: false,
            },
            endpoints: file.endpoints,
        }
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, base_url: Option<&str>, verbose: bool) -> Result<Self> {
        if let Some(base_url) = base_url {
            self.settings.base_url = normalize_base_url(base_url);
        }
        self.settings.verbose = verbose;
        self.validate()?;
        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let settings = &self.settings;

        reqwest::Url::parse(&settings.base_url).map_err(|e| {
            PerfError::InvalidConfig(format!("base-url '{}' is invalid: {}", settings.base_url, e))
        })?;

        if settings.concurrent_requests == 0 {
            return Err(PerfError::InvalidConfig(
                "concurrent-requests must be at least 1".to_string(),
            ));
        }

        if settings.concurrent_requests > MAX_CONCURRENT_REQUESTS {
            return Err(PerfError::InvalidConfig(format!(
                "concurrent-requests must not exceed {}",
                MAX_CONCURRENT_REQUESTS
            )));
        }

        if !(settings.timeout_seconds.is_finite() && settings.timeout_seconds > 0.0) {
            return Err(PerfError::InvalidConfig(
                "timeout-seconds must be a positive number".to_string(),
            ));
        }

        if settings.block_range_enabled && settings.block_start > settings.block_end {
            return Err(PerfError::InvalidConfig(format!(
                "block-range start ({}) must not exceed end ({})",
                settings.block_start, settings.block_end
            )));
        }

        if self.endpoints.is_empty() {
            return Err(PerfError::InvalidConfig(
                "at least one endpoint must be configured".to_string(),
            ));
        }

        for (position, endpoint) in self.endpoints.iter().enumerate() {
            if endpoint.path.trim().is_empty() {
                return Err(PerfError::InvalidConfig(format!(
                    "endpoint #{} has an empty path",
                    position + 1
                )));
            }
            if endpoint.http_method().is_none() {
                return Err(PerfError::InvalidConfig(format!(
                    "endpoint {} has invalid method '{}'",
                    endpoint.path, endpoint.method
                )));
            }
        }

        Ok(())
    }
}

/// Strip trailing slashes so `base-url + path` never doubles the separator
fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(extension: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const FULL_YAML: &str = r#"
test-name: rosetta-data
base-url: http://localhost:8080/
performance:
  concurrent-requests: 4
  total-requests: 20
  timeout-seconds: 5
  warm-up-requests: 2
block-range:
  enabled: true
  start: 100
  end: 102
endpoints:
  - path: /network/list
    method: POST
    payload:
      metadata: {}
  - path: /block
    method: post
    uses-block-index: true
    payload:
      network_identifier:
        blockchain: ethereum
        network: mainnet
      block_identifier:
        index: 1
"#;

    #[test]
    fn test_load_full_yaml() {
        let file = write_config(".yml", FULL_YAML);
        let config = TestConfig::load(file.path()).unwrap();

        assert_eq!(config.settings.test_name, "rosetta-data");
        assert_eq!(config.settings.base_url, "http://localhost:8080");
        assert_eq!(config.settings.concurrent_requests, 4);
        assert_eq!(config.settings.total_requests, 20);
        assert_eq!(config.settings.timeout_seconds, 5.0);
        assert_eq!(config.settings.warm_up_requests, 2);
        assert_eq!(config.settings.block_range(), Some((100, 102)));
        assert!(!config.settings.verbose);

        assert_eq!(config.endpoints.len(), 2);
        assert!(!config.endpoints[0].uses_block_index);
        assert!(config.endpoints[1].uses_block_index);
        let payload = config.endpoints[1].payload.as_ref().unwrap();
        assert_eq!(payload["block_identifier"]["index"], 1);
        assert_eq!(payload["network_identifier"]["network"], "mainnet");
    }

    #[test]
    fn test_load_defaults() {
        let file = write_config(
            ".yml",
            "endpoints:\n  - path: /health\n    method: GET\n",
        );
        let config = TestConfig::load(file.path()).unwrap();

        assert_eq!(config.settings, RunSettings::default());
        assert_eq!(config.settings.block_range(), None);
    }

    #[test]
    fn test_load_json_config() {
        let file = write_config(
            ".json",
            r#"{"base-url": "http://127.0.0.1:9000", "endpoints": [{"path": "/a", "method": "GET"}]}"#,
        );
        let config = TestConfig::load(file.path()).unwrap();
        assert_eq!(config.settings.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn test_missing_file() {
        let err = TestConfig::load(Path::new("/nonexistent/perf.yml")).unwrap_err();
        assert!(matches!(err, PerfError::ConfigNotFound(_)));
    }

    #[test]
    fn test_malformed_file() {
        let file = write_config(".yml", "endpoints: [unclosed\n");
        let err = TestConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, PerfError::Config(_)));
    }

    #[test]
    fn test_no_endpoints_rejected() {
        let file = write_config(".yml", "test-name: empty\n");
        let err = TestConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, PerfError::InvalidConfig(_)));
    }

    fn valid_config() -> TestConfig {
        TestConfig {
            settings: RunSettings::default(),
            endpoints: vec![EndpointDefinition::new("/block", "POST")],
        }
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let mut config = valid_config();
        config.settings.concurrent_requests = 0;
        assert!(matches!(config.validate(), Err(PerfError::InvalidConfig(_))));
    }

    #[test]
    fn test_concurrency_above_semaphore_limit_rejected() {
        let mut config = valid_config();
        config.settings.concurrent_requests = MAX_CONCURRENT_REQUESTS;
        assert!(config.validate().is_ok());

        config.settings.concurrent_requests = MAX_CONCURRENT_REQUESTS + 1;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, PerfError::InvalidConfig(_)));
        assert!(err.to_string().contains("concurrent-requests must not exceed"));
    }

    #[test]
    fn test_non_positive_timeout_rejected() {
        let mut config = valid_config();
        config.settings.timeout_seconds = 0.0;
        assert!(config.validate().is_err());
        config.settings.timeout_seconds = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_block_range_rejected_only_when_enabled() {
        let mut config = valid_config();
        config.settings.block_start = 10;
        config.settings.block_end = 5;
        assert!(config.validate().is_ok());

        config.settings.block_range_enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_method_rejected() {
        let mut config = valid_config();
        config.endpoints.push(EndpointDefinition::new("/bad", "NOT VALID"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("/bad"));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let mut config = valid_config();
        config.settings.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = valid_config()
            .with_overrides(Some("http://10.0.0.1:8080/"), true)
            .unwrap();
        assert_eq!(config.settings.base_url, "http://10.0.0.1:8080");
        assert!(config.settings.verbose);
    }

    #[test]
    fn test_timeout_duration() {
        let settings = RunSettings {
            timeout_seconds: 2.5,
            ..Default::default()
        };
        assert_eq!(settings.timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_cli_defaults() {
        let args = CliArgs::parse_from(["mesh-perf"]);
        assert_eq!(args.config, PathBuf::from("config/data-test-config.yml"));
        assert!(args.output.is_none());
        assert!(!args.verbose);
        assert!(!args.mock_server);
    }

    #[test]
    fn test_cli_flags() {
        let args = CliArgs::parse_from([
            "mesh-perf",
            "--config",
            "perf.yml",
            "-o",
            "out/report.json",
            "-v",
            "--base-url",
            "http://localhost:1234",
        ]);
        assert_eq!(args.config, PathBuf::from("perf.yml"));
        assert_eq!(args.output, Some(PathBuf::from("out/report.json")));
        assert!(args.verbose);
        assert_eq!(args.base_url.as_deref(), Some("http://localhost:1234"));
    }
}
