//! # Secret Stores
//!
//! `SecretStore` (namespaced) and `ClusterSecretStore` (cluster-scoped) both
//! carry a [`StoreConfig`]: a union in which exactly one backend must be set.

use serde::{Deserialize, Serialize};

use crate::crd::{AwsStore, GcpStore, VaultStore};
use crate::provider::StoreError;

/// SecretStore Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: secret-management.microscaler.io/v1alpha1
/// kind: SecretStore
/// metadata:
///   name: vault-backend
///   namespace: default
/// spec:
///   provider:
///     vault:
///       server: https://vault.example.com:8200
///       path: secret
///       version: v2
///       auth:
///         tokenSecretRef:
///           name: vault-token
///           key: token
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "SecretStore",
    group = "secret-management.microscaler.io",
    version = "v1alpha1",
    namespaced,
    shortname = "ss"
)]
#[serde(rename_all = "camelCase")]
pub struct SecretStoreSpec {
    /// Backend configuration
    pub provider: StoreConfig,
}

/// ClusterSecretStore Custom Resource Definition
///
/// Same shape as `SecretStore` but usable from any namespace. Secret key
/// selectors may name their own namespace.
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ClusterSecretStore",
    group = "secret-management.microscaler.io",
    version = "v1alpha1",
    shortname = "css"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSecretStoreSpec {
    /// Backend configuration
    pub provider: StoreConfig,
}

/// Backend configuration. Exactly one field must be set.
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// HashiCorp Vault KV engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<VaultStore>,
    /// AWS Secrets Manager
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsStore>,
    /// GCP Secret Manager
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp: Option<GcpStore>,
}

/// Discriminator naming a backend implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreBackend {
    Vault,
    Aws,
    Gcp,
}

impl StoreBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vault => "vault",
            Self::Aws => "aws",
            Self::Gcp => "gcp",
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single populated backend of a [`StoreConfig`]
#[derive(Debug, Clone, Copy)]
pub enum StoreProvider<'a> {
    Vault(&'a VaultStore),
    Aws(&'a AwsStore),
    Gcp(&'a GcpStore),
}

impl StoreProvider<'_> {
    pub fn backend(&self) -> StoreBackend {
        match self {
            Self::Vault(_) => StoreBackend::Vault,
            Self::Aws(_) => StoreBackend::Aws,
            Self::Gcp(_) => StoreBackend::Gcp,
        }
    }
}

impl StoreConfig {
    /// Returns the one populated backend.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unconfigured`] when no backend is set and
    /// [`StoreError::Ambiguous`] when more than one is.
    pub fn provider(&self) -> Result<StoreProvider<'_>, StoreError> {
        match (&self.vault, &self.aws, &self.gcp) {
            (Some(vault), None, None) => Ok(StoreProvider::Vault(vault)),
            (None, Some(aws), None) => Ok(StoreProvider::Aws(aws)),
            (None, None, Some(gcp)) => Ok(StoreProvider::Gcp(gcp)),
            (None, None, None) => Err(StoreError::Unconfigured),
            _ => Err(StoreError::Ambiguous(self.populated())),
        }
    }

    /// Discriminator of the one populated backend.
    ///
    /// # Errors
    ///
    /// Same as [`StoreConfig::provider`].
    pub fn backend(&self) -> Result<StoreBackend, StoreError> {
        self.provider().map(|provider| provider.backend())
    }

    fn populated(&self) -> Vec<StoreBackend> {
        [
            self.vault.as_ref().map(|_| StoreBackend::Vault),
            self.aws.as_ref().map(|_| StoreBackend::Aws),
            self.gcp.as_ref().map(|_| StoreBackend::Gcp),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
