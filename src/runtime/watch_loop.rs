//! # Watch Loop
//!
//! Watches ExternalSecrets and the Secrets they own, and dispatches
//! reconciliations. At most one reconcile runs per object at a time.
//!
//! ExternalSecret events only trigger a reconcile when the spec generation,
//! labels or annotations change. Status writes are filtered out. Edits to an
//! owned Secret always trigger its owner.

use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams};
use kube::Client;
use kube_runtime::{
    controller, predicates, reflector, watcher, Controller, Predicate, WatchStreamExt,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::controller::reconciler::{reconcile, Reconciler};
use crate::crd::ExternalSecret;
use crate::runtime::error_policy::handle_reconciliation_error;
use crate::server::ServerState;

/// Run the controller watch loop until a shutdown signal arrives
///
/// # Errors
///
/// Fails when the ExternalSecret CRD cannot be listed.
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let namespace = reconciler.config.namespace.clone();
    let (external_secrets, secrets): (Api<ExternalSecret>, Api<Secret>) =
        match namespace.as_deref() {
            Some(ns) => (
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client, ns),
            ),
            None => (Api::all(client.clone()), Api::all(client)),
        };

    external_secrets
        .list(&ListParams::default().limit(1))
        .await
        .context("ExternalSecret CRD is not queryable, is it installed?")?;

    spawn_shutdown_handler(reconciler.shutdown.clone(), server_state.clone());

    let concurrency = reconciler.config.max_concurrent_reconciles;
    info!(
        namespace = namespace.as_deref().unwrap_or("<all>"),
        concurrency,
        "Starting controller watch loop..."
    );
    server_state.set_ready(true);

    let (reader, writer) = reflector::store();
    let trigger = watcher(external_secrets, watcher::Config::default().any_semantic())
        .default_backoff()
        .reflect(writer)
        .applied_objects()
        .predicate_filter(trigger_predicate());

    Controller::for_stream(trigger, reader)
        .owns(secrets, watcher::Config::default())
        .with_config(controller::Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile, handle_reconciliation_error, reconciler)
        .for_each(|result| async move {
            match result {
                Ok((object, _action)) => debug!(resource = %object, "watch.event.success"),
                Err(e) => warn!(error = %e, "watch.event.error"),
            }
        })
        .await;

    server_state.set_ready(false);
    info!("Controller watch loop stopped");
    Ok(())
}

/// Fields of an ExternalSecret whose change needs a new sync. Labels and
/// annotations are copied to the generated Secret, so they count too.
fn trigger_predicate() -> impl Predicate<ExternalSecret> {
    predicates::generation
        .combine(predicates::labels)
        .combine(predicates::annotations)
}

/// Mark the controller unready and cancel in-flight backend calls on
/// SIGTERM or SIGINT
fn spawn_shutdown_handler(shutdown: CancellationToken, server_state: Arc<ServerState>) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal, initiating graceful shutdown...");
        server_state.set_ready(false);
        shutdown.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGTERM, only SIGINT triggers shutdown");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
