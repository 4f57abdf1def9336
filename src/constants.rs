//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default requeue interval after a failed reconciliation (seconds)
pub const DEFAULT_REQUEUE_AFTER_SECS: u64 = 30;

/// Default deadline for a single remote call (login, read) in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default upper bound on reconciliations running at once
pub const DEFAULT_MAX_CONCURRENT_RECONCILES: u16 = 10;

/// Field manager used for server-side apply and status patches
pub const DEFAULT_FIELD_MANAGER: &str = "external-secrets-controller";

/// Default mount path of the Vault AppRole auth method
pub const DEFAULT_VAULT_APPROLE_PATH: &str = "approle";

/// Default mount path of the Vault Kubernetes auth method
pub const DEFAULT_VAULT_KUBERNETES_PATH: &str = "kubernetes";

/// Projected service account token of the controller pod
pub const SERVICE_ACCOUNT_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Default GCP Secret Manager REST endpoint
pub const DEFAULT_GCP_SECRET_MANAGER_ENDPOINT: &str = "https://secretmanager.googleapis.com";

/// GCP metadata server token endpoint (Workload Identity / GCE)
pub const GCP_METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// OAuth scope requested for GCP Secret Manager access
pub const GCP_CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Default GCP secret version
pub const DEFAULT_GCP_SECRET_VERSION: &str = "latest";

/// Session name used for STS AssumeRole
pub const AWS_ASSUME_ROLE_SESSION_NAME: &str = "external-secrets-controller";

/// Default Secret type of generated Secrets
pub const DEFAULT_SECRET_TYPE: &str = "Opaque";
