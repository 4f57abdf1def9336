//! Common test utilities for Pact integration tests
//!
//! Provides shared initialization code for all Pact tests, including
//! rustls crypto provider setup.

#![allow(dead_code, reason = "each test binary uses a subset")]

use std::collections::BTreeMap;
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use external_secrets_controller::controller::reconciler::ClusterApi;
use external_secrets_controller::crd::{
    ClusterSecretStore, ExternalSecret, ExternalSecretStatus, SecretStore,
};
use external_secrets_controller::provider::CallContext;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use tokio_util::sync::CancellationToken;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Uses a `Once` to ensure it's only called once per test binary.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// Call context with a generous deadline and a live token
pub fn call_context() -> CallContext {
    CallContext::new(CancellationToken::new(), Duration::from_secs(10))
}

/// Mock server URL without the trailing slash
pub fn base_url(url: impl std::fmt::Display) -> String {
    url.to_string().trim_end_matches('/').to_string()
}

/// Cluster holding only Secrets, for resolving store credentials
#[derive(Debug, Default)]
pub struct SecretsOnlyCluster {
    secrets: BTreeMap<(String, String), Secret>,
}

impl SecretsOnlyCluster {
    pub fn with_secret(mut self, namespace: &str, name: &str, data: &[(&str, &str)]) -> Self {
        let data = data
            .iter()
            .map(|(key, value)| ((*key).to_string(), ByteString(value.as_bytes().to_vec())))
            .collect();
        self.secrets.insert(
            (namespace.to_string(), name.to_string()),
            Secret {
                data: Some(data),
                ..Secret::default()
            },
        );
        self
    }
}

#[async_trait]
impl ClusterApi for SecretsOnlyCluster {
    async fn get_external_secret(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<Option<ExternalSecret>, kube::Error> {
        Ok(None)
    }

    async fn get_secret_store(
        &self,
        _namespace: &str,
        _name: &str,
    ) -> Result<Option<SecretStore>, kube::Error> {
        Ok(None)
    }

    async fn get_cluster_secret_store(
        &self,
        _name: &str,
    ) -> Result<Option<ClusterSecretStore>, kube::Error> {
        Ok(None)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error> {
        Ok(self
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn apply_secret(
        &self,
        _namespace: &str,
        _name: &str,
        secret: &Secret,
    ) -> Result<Secret, kube::Error> {
        Ok(secret.clone())
    }

    async fn patch_external_secret_status(
        &self,
        _namespace: &str,
        _name: &str,
        _status: &ExternalSecretStatus,
    ) -> Result<(), kube::Error> {
        Ok(())
    }
}
