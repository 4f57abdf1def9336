//! # Cluster API
//!
//! The Kubernetes reads and writes the reconciler performs, behind a trait so
//! the engine can run against a mock.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
#[cfg(test)]
use mockall::automock;

use crate::crd::{ClusterSecretStore, ExternalSecret, ExternalSecretStatus, SecretStore};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// `Ok(None)` when the ExternalSecret no longer exists
    async fn get_external_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ExternalSecret>, kube::Error>;

    async fn get_secret_store(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<SecretStore>, kube::Error>;

    async fn get_cluster_secret_store(
        &self,
        name: &str,
    ) -> Result<Option<ClusterSecretStore>, kube::Error>;

    async fn get_secret(&self, namespace: &str, name: &str)
        -> Result<Option<Secret>, kube::Error>;

    /// Server-side apply of the whole Secret
    async fn apply_secret(
        &self,
        namespace: &str,
        name: &str,
        secret: &Secret,
    ) -> Result<Secret, kube::Error>;

    async fn patch_external_secret_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ExternalSecretStatus,
    ) -> Result<(), kube::Error>;
}

/// [`ClusterApi`] backed by a live kube client
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
    field_manager: String,
}

impl std::fmt::Debug for KubeClusterApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterApi")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeClusterApi {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn get_external_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ExternalSecret>, kube::Error> {
        let api: Api<ExternalSecret> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }

    async fn get_secret_store(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<SecretStore>, kube::Error> {
        let api: Api<SecretStore> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }

    async fn get_cluster_secret_store(
        &self,
        name: &str,
    ) -> Result<Option<ClusterSecretStore>, kube::Error> {
        let api: Api<ClusterSecretStore> = Api::all(self.client.clone());
        api.get_opt(name).await
    }

    async fn get_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Secret>, kube::Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await
    }

    async fn apply_secret(
        &self,
        namespace: &str,
        name: &str,
        secret: &Secret,
    ) -> Result<Secret, kube::Error> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let params = PatchParams::apply(&self.field_manager).force();
        api.patch(name, &params, &Patch::Apply(secret)).await
    }

    async fn patch_external_secret_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ExternalSecretStatus,
    ) -> Result<(), kube::Error> {
        let api: Api<ExternalSecret> = Api::namespaced(self.client.clone(), namespace);
        let patch = serde_json::json!({ "status": status });
        api.patch_status(
            name,
            &PatchParams::apply(&self.field_manager),
            &Patch::Merge(&patch),
        )
        .await?;
        Ok(())
    }
}
