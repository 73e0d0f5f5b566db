use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;

use mesh_perf::bench::{report, MockServer, MockServerConfig, RunOrchestrator};
use mesh_perf::config::{CliArgs, TestConfig};
use mesh_perf::error::PerfError;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();
    init_logging(&args.log_level);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", failure_message(&e));
            ExitCode::FAILURE
        }
    }
}

/// Message printed before exiting with status 1
fn failure_message(error: &anyhow::Error) -> String {
    match error.downcast_ref::<PerfError>() {
        Some(PerfError::ConfigNotFound(path)) => {
            format!("Error: Configuration file '{}' not found.", path.display())
        }
        _ => format!("Error running performance tests: {:#}", error),
    }
}

fn init_logging(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level.to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();
}

async fn run(args: CliArgs) -> Result<()> {
    let config = TestConfig::load(&args.config)?;

    // Keep the mock target alive for the whole run
    let mut mock_server = if args.mock_server {
        let mut server = MockServer::new(MockServerConfig {
            latency_ms: args.mock_latency_ms,
            ..Default::default()
        });
        server
            .start()
            .await
            .context("Failed to start mock server")?;
        tracing::info!("Mock server started on {}", server.url());
        Some(server)
    } else {
        None
    };

    let base_url = mock_server
        .as_ref()
        .map(MockServer::url)
        .or(args.base_url.clone());
    let config = config.with_overrides(base_url.as_deref(), args.verbose)?;

    let output = args.output.clone().unwrap_or_else(report::default_output_path);

    print_startup_banner(&args, &config);

    let report = RunOrchestrator::new(config).run_all().await?;
    report
        .write_to(&output)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;
    println!("\nDetailed report saved to: {}", output.display());
    report.print_summary();

    if let Some(server) = mock_server.as_mut() {
        server.stop();
    }

    Ok(())
}

fn print_startup_banner(args: &CliArgs, config: &TestConfig) {
    let settings = &config.settings;
    println!(
        "Starting performance tests with configuration: {}",
        args.config.display()
    );
    println!("Test Parameters:");
    println!("  Test Name: {}", settings.test_name);
    println!("  Base URL: {}", settings.base_url);
    println!("  Endpoints: {}", config.endpoints.len());
    println!("  Concurrent Requests: {}", settings.concurrent_requests);
    println!("  Total Requests per Endpoint: {}", settings.total_requests);
    println!("  Timeout: {}s", settings.timeout_seconds);
    println!("  Warm-up Requests: {}", settings.warm_up_requests);
    if let Some((start, end)) = settings.block_range() {
        println!("  Block Range: {} to {}", start, end);
    }
    println!("  Verbose Mode: {}", settings.verbose);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_config_fails_before_any_request() {
        let args = CliArgs::parse_from(["mesh-perf", "--config", "/nonexistent/perf.yml"]);

        let err = run(args).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PerfError>(),
            Some(PerfError::ConfigNotFound(_))
        ));
        assert_eq!(
            failure_message(&err),
            "Error: Configuration file '/nonexistent/perf.yml' not found."
        );
    }

    #[tokio::test]
    async fn test_invalid_config_reports_generic_failure() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"test-name: empty\n").unwrap();
        let path = file.path().to_string_lossy().to_string();
        let args = CliArgs::parse_from(["mesh-perf", "--config", path.as_str()]);

        let err = run(args).await.unwrap_err();

        assert_eq!(
            failure_message(&err),
            "Error running performance tests: Invalid configuration: at least one endpoint must be configured"
        );
    }

    #[test]
    fn test_other_errors_use_the_generic_message() {
        let err = anyhow::Error::from(PerfError::Scheduler("closed".to_string()))
            .context("Failed to run");
        assert_eq!(
            failure_message(&err),
            "Error running performance tests: Failed to run: Scheduler error: closed"
        );
    }
}
