//! # Initialization
//!
//! Controller initialization logic: rustls setup, tracing, metrics, the HTTP
//! server and the reconciler context.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use kube::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{ControllerConfig, LogFormat};
use crate::controller::reconciler::{KubeClusterApi, Reconciler};
use crate::observability;
use crate::provider::BackendRegistry;
use crate::server::{start_server, ServerState};

const DEFAULT_LOG_FILTER: &str = "external_secrets_controller=info";

/// Everything the watch loop needs
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Reconciler context
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("reconciler", &self.reconciler)
            .field("server_ready", &self.server_state.is_ready())
            .finish_non_exhaustive()
    }
}

/// Install the ring crypto provider for rustls. Must run before any TLS
/// client is built.
pub fn install_crypto_provider() {
    // an already installed provider is fine
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Set up the tracing subscriber. `RUST_LOG` overrides the default filter.
///
/// # Errors
///
/// Fails when a global subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    result.map_err(|e| anyhow!("failed to initialize tracing: {e}"))
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - tracing subscriber setup
/// - metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
/// - backend registry and reconciler setup
///
/// # Errors
///
/// Fails when logging, metrics, the kube client or the registry cannot be
/// set up.
pub async fn initialize(config: ControllerConfig) -> Result<InitializationResult> {
    install_crypto_provider();
    init_tracing(config.log_format)?;

    info!("Starting External Secrets Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    // not ready until the watch loop starts
    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let server_state_clone = server_state.clone();
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let registry = BackendRegistry::with_default_backends(&config.endpoints)
        .context("Failed to register secret store backends")?;
    info!(registry = ?registry, "Registered secret store backends");

    let cluster = KubeClusterApi::new(client.clone(), config.field_manager.clone());
    let reconciler = Arc::new(Reconciler::new(
        Arc::new(cluster),
        Arc::new(registry),
        config,
        CancellationToken::new(),
    ));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
    })
}
