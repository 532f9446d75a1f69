//! Configuration module for the GPU checker
//!
//! Handles loading and validating configuration from YAML files, with CLI and
//! environment overrides applied on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gpu_checker_core::notify::{
    RetryPolicy, WebhookIdentity, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY,
};

use crate::cli::Cli;

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Print JSON instead of the summary table
    #[serde(default)]
    pub json: bool,
}

/// Webhook notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Webhook URL; notifications are disabled when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Username shown on messages
    #[serde(default = "default_username")]
    pub username: String,

    /// Icon shown on messages
    #[serde(default = "default_icon_emoji")]
    pub icon_emoji: String,

    /// Only notify when no Ready GPU node exists
    #[serde(default)]
    pub only_on_error: bool,

    /// Retries after a reset or aborted connection
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retries
    #[serde(with = "humantime_serde", default = "default_retry_delay")]
    pub retry_delay: Duration,

    /// Per-request timeout
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            username: default_username(),
            icon_emoji: default_icon_emoji(),
            only_on_error: false,
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            timeout: default_timeout(),
        }
    }
}

impl NotificationConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
        }
    }

    pub fn identity(&self) -> WebhookIdentity {
        WebhookIdentity {
            username: self.username.clone(),
            icon_emoji: self.icon_emoji.clone(),
        }
    }

    /// Configured webhook URL, ignoring empty strings
    pub fn endpoint(&self) -> Option<&str> {
        self.webhook_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Kubeconfig path; falls back to the default discovery chain
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,

    /// Notification configuration
    #[serde(default)]
    pub notification: NotificationConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let notification = &self.notification;
        if notification.timeout.is_zero() {
            anyhow::bail!("notification.timeout must be > 0");
        }
        if notification.username.trim().is_empty() {
            anyhow::bail!("notification.username must not be empty");
        }
        Ok(())
    }

    /// Apply CLI flags on top of the file configuration
    ///
    /// The webhook URL from the CLI also covers `SLACK_WEBHOOK_URL`.
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if cli.kubeconfig.is_some() {
            self.kubeconfig = cli.kubeconfig.clone();
        }
        if cli.json {
            self.output.json = true;
        }

        let notification = &mut self.notification;
        if cli.slack_webhook.is_some() {
            notification.webhook_url = cli.slack_webhook.clone();
        }
        if let Some(username) = &cli.slack_username {
            notification.username = username.clone();
        }
        if cli.slack_only_on_error {
            notification.only_on_error = true;
        }
        if let Some(count) = cli.slack_retry_count {
            notification.max_retries = count;
        }
        if let Some(delay) = cli.slack_retry_delay {
            notification.retry_delay = delay;
        }
        self
    }
}

// Default value functions
fn default_username() -> String {
    "k8s-gpu-checker".to_string()
}

fn default_icon_emoji() -> String {
    ":robot_face:".to_string()
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_delay() -> Duration {
    DEFAULT_RETRY_DELAY
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}
