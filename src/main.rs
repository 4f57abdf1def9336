//! # External Secrets Controller
//!
//! A Kubernetes controller that materializes `ExternalSecret` resources into
//! native Secrets, reading the values from HashiCorp Vault, AWS Secrets
//! Manager or GCP Secret Manager.
//!
//! ## Overview
//!
//! 1. **Watching ExternalSecrets** - and the Secrets they own, in one or all namespaces
//! 2. **Resolving stores** - `SecretStore` or `ClusterSecretStore` with exactly one backend
//! 3. **Fetching values** - `dataFrom` maps and `data` entries, merged in order
//! 4. **Templating** - deep-merge of `spec.template` over the generated Secret
//! 5. **Applying** - one server-side apply per reconcile, owned by the ExternalSecret
//!
//! Failures set `Ready=False` on the ExternalSecret and are retried after a
//! fixed delay. Metrics and probes are served on the metrics port.

use anyhow::Result;
use clap::Parser;
use external_secrets_controller::config::{Args, ControllerConfig};
use external_secrets_controller::runtime::{initialization, watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ControllerConfig::from(Args::parse());

    let init = initialization::initialize(config).await?;
    watch_loop::run_watch_loop(init.client, init.reconciler, init.server_state).await
}
