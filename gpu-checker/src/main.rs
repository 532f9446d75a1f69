//! Kubernetes GPU checker
//!
//! Takes one snapshot of the cluster's nodes, reports how many expose GPU
//! capacity and how many of those are Ready, optionally notifies a webhook,
//! and exits with a code that reflects the verdict.

mod cli;
mod config;
mod output;

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::Cli;
use config::Config;
use gpu_checker_core::notify::{compose, should_notify, HttpTransport, WebhookNotifier};
use gpu_checker_core::{evaluate, EvaluationResult, Verdict};
use gpu_checker_k8s::K8sClient;
use output::{render_summary, render_table, JsonError, JsonReport};

/// Exit code for any failure other than a GPU verdict
const EXIT_FAILURE: u8 = 1;

/// Initialize the tracing/logging subsystem
///
/// Logs go to stderr; stdout carries the report.
fn init_logging(log_level: &str, json_format: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Map a verdict to the process exit code
fn exit_code(verdict: Verdict) -> u8 {
    match verdict {
        Verdict::Healthy => 0,
        Verdict::NoGpu => 2,
        Verdict::DegradedNoReadyGpu => 3,
    }
}

/// Load the config file (if present) and apply CLI overrides
fn load_config(cli: &Cli) -> Result<Config> {
    let config = if cli.config.exists() {
        Config::from_file(&cli.config)
            .with_context(|| format!("Failed to load config from {:?}", cli.config))?
    } else {
        warn!(path = ?cli.config, "Config file not found, using defaults");
        Config::default()
    };

    let config = config.with_cli_overrides(cli);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Evaluate the cluster, notify, print the report
async fn run(config: &Config) -> Result<Verdict> {
    let client = K8sClient::connect(config.kubeconfig.as_deref()).await?;
    let result = evaluate(&client).await?;
    let verdict = result.verdict();

    info!(
        verdict = %verdict,
        gpu_nodes = result.total_gpu_nodes(),
        ready_gpu_nodes = result.ready_gpu_node_count(),
        "Cluster GPU status evaluated"
    );

    if let Some(delivered) = notify(config, &result).await {
        if !config.output.json {
            if delivered {
                println!("✅ Webhook message sent.");
            } else {
                eprintln!("❌ Failed to send webhook message.");
            }
        }
    }

    if config.output.json {
        let report = JsonReport::new(&result, Utc::now());
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_summary(&result));
        println!("{}", render_table(&result.gpu_nodes));
    }

    Ok(verdict)
}

/// Send the status message if a webhook is configured and the verdict calls for it
///
/// Returns `None` when nothing was sent. Delivery problems, including an
/// unusable URL or HTTP client, come back as `Some(false)`.
async fn notify(config: &Config, result: &EvaluationResult) -> Option<bool> {
    let notification = &config.notification;
    let endpoint = notification.endpoint()?;

    if !should_notify(result.verdict(), notification.only_on_error) {
        info!("Cluster healthy, skipping notification");
        return None;
    }

    let transport = match HttpTransport::new(notification.timeout) {
        Ok(transport) => transport,
        Err(e) => {
            error!(error = %e, "Failed to create webhook transport");
            return Some(false);
        }
    };
    let notifier = WebhookNotifier::new(
        transport,
        notification.identity(),
        notification.retry_policy(),
    );

    Some(notifier.deliver(Some(endpoint), &compose(result)).await)
}

/// Print a failure in the selected output format
fn report_failure(err: &anyhow::Error, json: bool) {
    let message = format!("{:#}", err);
    error!(error = %message, "GPU check failed");

    if json {
        let body = JsonError { error: message };
        match serde_json::to_string(&body) {
            Ok(line) => println!("{}", line),
            Err(_) => println!("{{\"error\": \"internal error\"}}"),
        }
    } else {
        eprintln!("Error: {:?}", err);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env before clap reads env-backed flags
    dotenvy::dotenv().ok();

    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(&cli.log_level, cli.log_json);

    info!(version = env!("CARGO_PKG_VERSION"), "GPU checker starting");

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            report_failure(&e, cli.json);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match run(&config).await {
        Ok(verdict) => ExitCode::from(exit_code(verdict)),
        Err(e) => {
            report_failure(&e, config.output.json);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
