//! # Reconcile
//!
//! The per-ExternalSecret sync pass and its status bookkeeping.

use std::sync::Arc;
use std::time::Instant;

use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::crd::{ConditionStatus, ExternalSecret, StoreConfig, StoreKind, StoreRef};
use crate::observability::metrics;
use crate::provider::{CallContext, StoreContext};

use super::{
    build_secret, fetch_data, next_status, ClusterApi, Reconciler, ReconcilerError, SyncError,
};

/// Condition reason after a successful sync
const SYNCED_REASON: &str = "SecretSynced";

/// Reconcile one ExternalSecret.
///
/// Success waits for the next change. Failures are recorded in the `Ready`
/// condition and returned so the error policy requeues.
pub async fn reconcile(
    obj: Arc<ExternalSecret>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();
    let span = info_span!(
        "external_secret.reconcile",
        external_secret = %name,
        namespace = %namespace
    );
    let start = Instant::now();
    metrics::increment_reconciliations();

    let result = async {
        // the watched copy may be stale
        let external_secret = match ctx.cluster.get_external_secret(&namespace, &name).await {
            Ok(Some(external_secret)) => external_secret,
            Ok(None) => {
                info!("ExternalSecret no longer exists, nothing to do");
                return Ok(Action::await_change());
            }
            Err(source) => {
                return Err(SyncError::LoadFailed {
                    namespace: namespace.clone(),
                    name: name.clone(),
                    source,
                }
                .into());
            }
        };

        let call_ctx = CallContext::new(ctx.shutdown.child_token(), ctx.config.request_timeout());
        match sync(&ctx, &call_ctx, &external_secret).await {
            Ok(secret) => {
                metrics::increment_secrets_applied();
                info!(
                    keys = secret.data.as_ref().map_or(0, |d| d.len()),
                    "Secret synced"
                );
                update_status(&ctx, &external_secret, ConditionStatus::True, SYNCED_REASON, "")
                    .await;
                Ok(Action::await_change())
            }
            Err(SyncError::Cancelled) => {
                info!("Reconcile cancelled, leaving status untouched");
                Err(SyncError::Cancelled.into())
            }
            Err(error) => {
                warn!(reason = error.reason(), error = %error, "Failed to sync ExternalSecret");
                update_status(
                    &ctx,
                    &external_secret,
                    ConditionStatus::False,
                    error.reason(),
                    &error.to_string(),
                )
                .await;
                Err(error.into())
            }
        }
    }
    .instrument(span)
    .await;

    metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
    result
}

/// Fetch, build and apply the Secret of one ExternalSecret. Nothing is
/// applied unless every value was fetched and the template merged.
///
/// # Errors
///
/// The [`SyncError`] of the first failing stage.
pub async fn sync(
    reconciler: &Reconciler,
    ctx: &CallContext,
    external_secret: &ExternalSecret,
) -> Result<Secret, SyncError> {
    if ctx.is_cancelled() {
        return Err(SyncError::Cancelled);
    }

    let name = external_secret.name_any();
    let namespace = external_secret.namespace().unwrap_or_default();
    let store_ref = &external_secret.spec.store_ref;

    let config = resolve_store(reconciler.cluster.as_ref(), &namespace, store_ref).await?;
    let factory = reconciler.registry.resolve(&config)?;
    let backend = config.backend()?;
    debug!(
        store = %store_ref.name,
        kind = %store_ref.kind,
        backend = %backend,
        "Resolved store"
    );

    let store = StoreContext {
        config: &config,
        kind: store_ref.kind,
        namespace: &namespace,
        cluster: reconciler.cluster.as_ref(),
    };
    let client = factory
        .new_client(ctx, &store)
        .await
        .map_err(SyncError::setup)?;

    let data = fetch_data(ctx, client.as_ref(), &external_secret.spec).await?;
    let secret = build_secret(external_secret, data)?;

    if ctx.is_cancelled() {
        return Err(SyncError::Cancelled);
    }
    reconciler
        .cluster
        .apply_secret(&namespace, &name, &secret)
        .await
        .map_err(SyncError::SecretUpsertFailed)
}

async fn resolve_store(
    cluster: &dyn ClusterApi,
    namespace: &str,
    store_ref: &StoreRef,
) -> Result<StoreConfig, SyncError> {
    let not_found = |message: String| SyncError::StoreNotFound {
        kind: store_ref.kind,
        name: store_ref.name.clone(),
        message,
    };

    let found = match store_ref.kind {
        StoreKind::SecretStore => cluster
            .get_secret_store(namespace, &store_ref.name)
            .await
            .map(|store| store.map(|s| s.spec.provider)),
        StoreKind::ClusterSecretStore => cluster
            .get_cluster_secret_store(&store_ref.name)
            .await
            .map(|store| store.map(|s| s.spec.provider)),
    };

    match found {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Err(not_found("not found".to_string())),
        Err(e) => Err(not_found(e.to_string())),
    }
}

/// Write the `Ready` condition. Best effort: failures are logged and counted.
async fn update_status(
    reconciler: &Reconciler,
    external_secret: &ExternalSecret,
    status: ConditionStatus,
    reason: &str,
    message: &str,
) {
    let now = chrono::Utc::now().to_rfc3339();
    let Some(next) = next_status(
        external_secret.status.as_ref(),
        external_secret.metadata.generation,
        status,
        reason,
        message,
        &now,
    ) else {
        debug!("Ready condition unchanged, skipping status update");
        return;
    };

    let name = external_secret.name_any();
    let namespace = external_secret.namespace().unwrap_or_default();
    if let Err(e) = reconciler
        .cluster
        .patch_external_secret_status(&namespace, &name, &next)
        .await
    {
        warn!(error = %e, "Failed to update ExternalSecret status");
        metrics::increment_status_update_failures();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ControllerConfig, ProviderEndpoints};
    use crate::controller::reconciler::MockClusterApi;
    use crate::crd::{
        ExternalSecretData, ExternalSecretSpec, ExternalSecretStatus, RemoteReference,
        SecretKeySelector, SecretStore, SecretStoreSpec, StoreBackend, VaultAppRole, VaultAuth,
        VaultKvVersion, VaultStore,
    };
    use crate::provider::{
        BackendRegistry, ClientFactory, ProviderError, SecretStoreClient,
    };
    use async_trait::async_trait;
    use k8s_openapi::ByteString;
    use pact_consumer::prelude::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    const NAMESPACE: &str = "default";
    const NAME: &str = "db-credentials";
    const STORE: &str = "vault-backend";

    /// Backend serving fixed values by reference name
    #[derive(Clone)]
    struct StaticBackend {
        values: BTreeMap<String, Vec<u8>>,
    }

    #[async_trait]
    impl SecretStoreClient for StaticBackend {
        async fn get_secret(
            &self,
            _ctx: &CallContext,
            reference: &RemoteReference,
        ) -> Result<Vec<u8>, ProviderError> {
            self.values
                .get(&reference.name)
                .cloned()
                .ok_or_else(|| ProviderError::read(reference, "secret not found"))
        }

        async fn get_secret_map(
            &self,
            _ctx: &CallContext,
            reference: &RemoteReference,
        ) -> Result<BTreeMap<String, Vec<u8>>, ProviderError> {
            Err(ProviderError::read(reference, "maps are not served"))
        }
    }

    #[async_trait]
    impl ClientFactory for StaticBackend {
        async fn new_client(
            &self,
            _ctx: &CallContext,
            _store: &StoreContext<'_>,
        ) -> Result<Box<dyn SecretStoreClient>, ProviderError> {
            Ok(Box::new(self.clone()))
        }
    }

    fn vault_store(server: &str, auth: VaultAuth) -> SecretStore {
        SecretStore::new(
            STORE,
            SecretStoreSpec {
                provider: StoreConfig {
                    vault: Some(VaultStore {
                        server: server.to_string(),
                        path: "secret".to_string(),
                        version: VaultKvVersion::V2,
                        namespace: None,
                        ca_bundle: None,
                        auth,
                    }),
                    ..StoreConfig::default()
                },
            },
        )
    }

    fn external_secret() -> ExternalSecret {
        let mut es = ExternalSecret::new(
            NAME,
            ExternalSecretSpec {
                store_ref: StoreRef {
                    name: STORE.to_string(),
                    kind: StoreKind::SecretStore,
                },
                data: vec![ExternalSecretData {
                    secret_key: "key".to_string(),
                    remote_ref: RemoteReference::new("apps/billing"),
                }],
                data_from: Vec::new(),
                template: None,
            },
        );
        es.metadata.namespace = Some(NAMESPACE.to_string());
        es.metadata.uid = Some("5d1e3f0a-8b7c-4e2d-9f61-0a2b3c4d5e6f".to_string());
        es.metadata.generation = Some(1);
        es
    }

    fn static_registry() -> Arc<BackendRegistry> {
        let registry = BackendRegistry::new();
        registry
            .register(
                StoreBackend::Vault,
                Arc::new(StaticBackend {
                    values: BTreeMap::from([(
                        "apps/billing".to_string(),
                        b"this-is-a-secret".to_vec(),
                    )]),
                }),
            )
            .unwrap();
        Arc::new(registry)
    }

    fn reconciler(cluster: MockClusterApi, registry: Arc<BackendRegistry>) -> Arc<Reconciler> {
        Arc::new(Reconciler::new(
            Arc::new(cluster),
            registry,
            ControllerConfig::default(),
            CancellationToken::new(),
        ))
    }

    #[tokio::test]
    async fn test_missing_store_sets_not_ready() {
        let mut cluster = MockClusterApi::new();
        cluster
            .expect_get_external_secret()
            .returning(|_, _| Ok(Some(external_secret())));
        cluster
            .expect_get_secret_store()
            .times(1)
            .returning(|namespace, name| {
                assert_eq!((namespace, name), (NAMESPACE, STORE));
                Ok(None)
            });
        cluster.expect_apply_secret().never();
        cluster
            .expect_patch_external_secret_status()
            .times(1)
            .returning(|_, _, status| {
                let ready = status.ready_condition().unwrap();
                assert_eq!(ready.status, ConditionStatus::False);
                assert_eq!(ready.reason.as_deref(), Some("StoreNotFound"));
                assert!(ready
                    .message
                    .as_deref()
                    .unwrap()
                    .contains("cannot get store reference"));
                Ok(())
            });

        let err = reconcile(Arc::new(external_secret()), reconciler(cluster, static_registry()))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "StoreNotFound");
    }

    #[tokio::test]
    async fn test_value_is_written_and_ready() {
        let mut cluster = MockClusterApi::new();
        cluster
            .expect_get_external_secret()
            .returning(|_, _| Ok(Some(external_secret())));
        cluster
            .expect_get_secret_store()
            .returning(|_, _| Ok(Some(vault_store("http://vault:8200", VaultAuth::default()))));
        cluster
            .expect_apply_secret()
            .times(1)
            .returning(|namespace, name, secret| {
                assert_eq!((namespace, name), (NAMESPACE, NAME));
                let data = secret.data.as_ref().unwrap();
                assert_eq!(data.get("key"), Some(&ByteString(b"this-is-a-secret".to_vec())));
                Ok(secret.clone())
            });
        cluster
            .expect_patch_external_secret_status()
            .times(1)
            .returning(|_, _, status| {
                let ready = status.ready_condition().unwrap();
                assert_eq!(ready.status, ConditionStatus::True);
                assert_eq!(ready.message, None);
                Ok(())
            });

        let action = reconcile(Arc::new(external_secret()), reconciler(cluster, static_registry()))
            .await
            .unwrap();
        assert_eq!(action, Action::await_change());
    }

    #[tokio::test]
    async fn test_second_pass_is_idempotent() {
        let status: Arc<Mutex<Option<ExternalSecretStatus>>> = Arc::new(Mutex::new(None));
        let applied: Arc<Mutex<Vec<Secret>>> = Arc::new(Mutex::new(Vec::new()));

        let mut cluster = MockClusterApi::new();
        let current = status.clone();
        cluster.expect_get_external_secret().returning(move |_, _| {
            let mut es = external_secret();
            es.status = current.lock().unwrap().clone();
            Ok(Some(es))
        });
        cluster
            .expect_get_secret_store()
            .returning(|_, _| Ok(Some(vault_store("http://vault:8200", VaultAuth::default()))));
        let sink = applied.clone();
        cluster
            .expect_apply_secret()
            .times(2)
            .returning(move |_, _, secret| {
                sink.lock().unwrap().push(secret.clone());
                Ok(secret.clone())
            });
        let written = status.clone();
        cluster
            .expect_patch_external_secret_status()
            .times(1)
            .returning(move |_, _, status| {
                *written.lock().unwrap() = Some(status.clone());
                Ok(())
            });

        let ctx = reconciler(cluster, static_registry());
        reconcile(Arc::new(external_secret()), ctx.clone()).await.unwrap();
        let first_transition = status
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|s| s.ready_condition())
            .and_then(|c| c.last_transition_time.clone());
        reconcile(Arc::new(external_secret()), ctx).await.unwrap();

        let applied = applied.lock().unwrap();
        assert_eq!(applied.len(), 2);
        assert_eq!(
            serde_json::to_vec(&applied[0]).unwrap(),
            serde_json::to_vec(&applied[1]).unwrap()
        );
        let second_transition = status
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|s| s.ready_condition())
            .and_then(|c| c.last_transition_time.clone());
        assert!(first_transition.is_some());
        assert_eq!(first_transition, second_transition);
    }

    #[tokio::test]
    async fn test_deleted_external_secret_is_noop() {
        let mut cluster = MockClusterApi::new();
        cluster.expect_get_external_secret().returning(|_, _| Ok(None));
        cluster.expect_get_secret_store().never();
        cluster.expect_apply_secret().never();
        cluster.expect_patch_external_secret_status().never();

        let action = reconcile(Arc::new(external_secret()), reconciler(cluster, static_registry()))
            .await
            .unwrap();
        assert_eq!(action, Action::await_change());
    }

    #[tokio::test]
    async fn test_cancelled_reconcile_skips_status() {
        let mut cluster = MockClusterApi::new();
        cluster
            .expect_get_external_secret()
            .returning(|_, _| Ok(Some(external_secret())));
        cluster.expect_apply_secret().never();
        cluster.expect_patch_external_secret_status().never();

        let ctx = reconciler(cluster, static_registry());
        ctx.shutdown.cancel();
        let err = reconcile(Arc::new(external_secret()), ctx).await.unwrap_err();
        assert_eq!(err.reason(), "Cancelled");
    }

    #[tokio::test]
    async fn test_rejected_approle_login_touches_no_secret() {
        let _ = rustls::crypto::ring::default_provider().install_default();

        let mut pact_builder = PactBuilder::new("External-Secrets-Controller", "Vault");
        pact_builder.interaction("AppRole login with an unknown secret id", "", |mut i| {
            i.given("the AppRole secret id has been revoked");
            i.request
                .method("POST")
                .path("/v1/auth/approle/login")
                .json_body(json!({"role_id": "billing", "secret_id": "revoked"}));
            i.response
                .status(400)
                .header("content-type", "application/json")
                .json_body(json!({"errors": ["invalid role or secret ID"]}));
            i
        });
        let mock_server = pact_builder.start_mock_server(None, None);
        let server = mock_server.url().to_string();

        let auth = VaultAuth {
            app_role: Some(VaultAppRole {
                path: "approle".to_string(),
                role_id: "billing".to_string(),
                secret_ref: SecretKeySelector {
                    name: "vault-approle".to_string(),
                    key: "secret-id".to_string(),
                    namespace: None,
                },
            }),
            ..VaultAuth::default()
        };
        let store = vault_store(&server, auth);

        let mut cluster = MockClusterApi::new();
        cluster
            .expect_get_external_secret()
            .returning(|_, _| Ok(Some(external_secret())));
        cluster
            .expect_get_secret_store()
            .returning(move |_, _| Ok(Some(store.clone())));
        cluster
            .expect_get_secret()
            .times(1)
            .returning(|namespace, name| {
                assert_eq!((namespace, name), (NAMESPACE, "vault-approle"));
                Ok(Some(Secret {
                    data: Some(BTreeMap::from([(
                        "secret-id".to_string(),
                        ByteString(b"revoked".to_vec()),
                    )])),
                    ..Secret::default()
                }))
            });
        cluster.expect_apply_secret().never();
        cluster
            .expect_patch_external_secret_status()
            .times(1)
            .returning(|_, _, status| {
                let ready = status.ready_condition().unwrap();
                assert_eq!(ready.status, ConditionStatus::False);
                assert_eq!(ready.reason.as_deref(), Some("StoreSetupFailed"));
                assert!(ready
                    .message
                    .as_deref()
                    .unwrap()
                    .starts_with("cannot setup store client"));
                Ok(())
            });

        let registry = Arc::new(
            BackendRegistry::with_default_backends(&ProviderEndpoints::default()).unwrap(),
        );
        let err = reconcile(Arc::new(external_secret()), reconciler(cluster, registry))
            .await
            .unwrap_err();
        assert_eq!(err.reason(), "StoreSetupFailed");
    }
}
