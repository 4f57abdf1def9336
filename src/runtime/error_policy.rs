//! # Error Policy
//!
//! Failed reconciliations are retried after a fixed delay. The failure has
//! already been written to the `Ready` condition by the reconciler.

use std::sync::Arc;

use kube::ResourceExt;
use kube_runtime::controller::Action;
use tracing::{error, info};

use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::ExternalSecret;
use crate::observability;

pub fn handle_reconciliation_error(
    obj: Arc<ExternalSecret>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = %name,
        resource.namespace = %namespace,
        reason = error.reason(),
        error = %error
    );
    let _error_guard = error_span.enter();

    let requeue_after = ctx.config.requeue_after();
    if ctx.shutdown.is_cancelled() {
        info!("Reconciliation of {}/{} interrupted by shutdown", namespace, name);
    } else {
        error!("Reconciliation error for {}/{}: {}", namespace, name, error);
        observability::metrics::increment_reconciliation_errors(error.reason());
        info!(
            "Retrying {}/{} in {}s",
            namespace,
            name,
            requeue_after.as_secs()
        );
    }

    Action::requeue(requeue_after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::controller::reconciler::{MockClusterApi, SyncError};
    use crate::crd::{ExternalSecretSpec, StoreKind, StoreRef};
    use crate::provider::BackendRegistry;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_failure_requeues_after_configured_delay() {
        let obj = Arc::new(ExternalSecret::new(
            "db",
            ExternalSecretSpec {
                store_ref: StoreRef {
                    name: "missing".to_string(),
                    kind: StoreKind::SecretStore,
                },
                data: Vec::new(),
                data_from: Vec::new(),
                template: None,
            },
        ));
        let ctx = Arc::new(Reconciler::new(
            Arc::new(MockClusterApi::new()),
            Arc::new(BackendRegistry::new()),
            ControllerConfig::default(),
            CancellationToken::new(),
        ));
        let error = ReconcilerError::from(SyncError::StoreNotFound {
            kind: StoreKind::SecretStore,
            name: "missing".to_string(),
            message: "not found".to_string(),
        });

        let action = handle_reconciliation_error(obj, &error, ctx);
        assert_eq!(action, Action::requeue(Duration::from_secs(30)));
    }
}
