//! CLI argument parsing for the GPU checker

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Kubernetes GPU checker - reports GPU node presence and readiness
#[derive(Debug, Parser)]
#[command(name = "gpu-checker")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/gpu-checker/config.yaml")]
    pub config: PathBuf,

    /// Path to kubeconfig (defaults to KUBECONFIG, ~/.kube/config or in-cluster)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Print machine-readable JSON only
    #[arg(long)]
    pub json: bool,

    /// Webhook URL for status notifications
    #[arg(long, env = "SLACK_WEBHOOK_URL")]
    pub slack_webhook: Option<String>,

    /// Username shown on webhook messages
    #[arg(long)]
    pub slack_username: Option<String>,

    /// Only notify when no Ready GPU node exists
    #[arg(long)]
    pub slack_only_on_error: bool,

    /// Maximum retries after a reset or aborted connection
    #[arg(long)]
    pub slack_retry_count: Option<u32>,

    /// Delay between retries, in seconds or as a duration such as "500ms"
    #[arg(long, value_parser = parse_retry_delay)]
    pub slack_retry_delay: Option<Duration>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "GPU_CHECKER_LOG_LEVEL")]
    pub log_level: String,

    /// Output logs in JSON format
    #[arg(long, default_value = "false", env = "GPU_CHECKER_LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Plain integers are seconds; anything else goes through humantime
fn parse_retry_delay(value: &str) -> Result<Duration, String> {
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(value).map_err(|e| format!("invalid retry delay {:?}: {}", value, e))
}
