//! # Controller Configuration
//!
//! Every setting has a default and can be overridden by a flag or the
//! matching environment variable (populated from a ConfigMap via `envFrom`).

use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::constants::{
    DEFAULT_FIELD_MANAGER, DEFAULT_MAX_CONCURRENT_RECONCILES, DEFAULT_METRICS_PORT,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_REQUEUE_AFTER_SECS,
};

/// Command-line flags of the controller binary
#[derive(Debug, Clone, Parser)]
#[command(name = "external-secrets-controller", version, about)]
pub struct Args {
    /// Only watch ExternalSecrets in this namespace (all namespaces when unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Port for /metrics, /healthz and /readyz
    #[arg(long, env = "METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Delay before retrying a failed reconciliation (seconds)
    #[arg(long, env = "REQUEUE_AFTER_SECS", default_value_t = DEFAULT_REQUEUE_AFTER_SECS)]
    pub requeue_after_secs: u64,

    /// Deadline for a single call to a secret backend (seconds)
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Maximum reconciliations running at once
    #[arg(long, env = "MAX_CONCURRENT_RECONCILES", default_value_t = DEFAULT_MAX_CONCURRENT_RECONCILES)]
    pub max_concurrent_reconciles: u16,

    /// Field manager for server-side apply
    #[arg(long, env = "FIELD_MANAGER", default_value = DEFAULT_FIELD_MANAGER)]
    pub field_manager: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Controller-level configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Namespace to watch, `None` for the whole cluster
    pub namespace: Option<String>,
    /// HTTP server port for metrics and probes
    pub metrics_port: u16,
    /// Requeue delay after a failed reconciliation (seconds)
    pub requeue_after_secs: u64,
    /// Per-call deadline for backend requests (seconds)
    pub request_timeout_secs: u64,
    /// Maximum concurrent reconciliations
    pub max_concurrent_reconciles: u16,
    /// Field manager for server-side apply and status patches
    pub field_manager: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Endpoint overrides for cloud backends
    pub endpoints: ProviderEndpoints,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            metrics_port: DEFAULT_METRICS_PORT,
            requeue_after_secs: DEFAULT_REQUEUE_AFTER_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_concurrent_reconciles: DEFAULT_MAX_CONCURRENT_RECONCILES,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            log_format: LogFormat::Text,
            endpoints: ProviderEndpoints::default(),
        }
    }
}

impl From<Args> for ControllerConfig {
    fn from(args: Args) -> Self {
        Self {
            namespace: args.namespace.filter(|ns| !ns.is_empty()),
            metrics_port: args.metrics_port,
            requeue_after_secs: args.requeue_after_secs,
            request_timeout_secs: args.request_timeout_secs,
            max_concurrent_reconciles: args.max_concurrent_reconciles,
            field_manager: args.field_manager,
            log_format: args.log_format,
            endpoints: ProviderEndpoints::from_env(),
        }
    }
}

impl ControllerConfig {
    /// Get reconciliation error requeue duration
    pub fn requeue_after(&self) -> Duration {
        Duration::from_secs(self.requeue_after_secs)
    }

    /// Get per-call backend deadline
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Service endpoint overrides, mainly for local emulators and contract tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderEndpoints {
    /// `AWS_SECRETSMANAGER_ENDPOINT`
    pub aws_secrets_manager: Option<String>,
    /// `AWS_STS_ENDPOINT`
    pub aws_sts: Option<String>,
    /// `GCP_SECRET_MANAGER_ENDPOINT`
    pub gcp_secret_manager: Option<String>,
}

impl ProviderEndpoints {
    /// Load overrides from environment variables
    pub fn from_env() -> Self {
        Self {
            aws_secrets_manager: env_var_opt("AWS_SECRETSMANAGER_ENDPOINT"),
            aws_sts: env_var_opt("AWS_STS_ENDPOINT"),
            gcp_secret_manager: env_var_opt("GCP_SECRET_MANAGER_ENDPOINT"),
        }
    }
}

/// Read environment variable, treating empty values as unset
fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
