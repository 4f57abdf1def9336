//! # Vault Store Configuration

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_VAULT_APPROLE_PATH, DEFAULT_VAULT_KUBERNETES_PATH};
use crate::crd::SecretKeySelector;

/// HashiCorp Vault KV store
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaultStore {
    /// Vault address, e.g. `https://vault.example.com:8200`
    pub server: String,
    /// Mount path of the KV engine, e.g. `secret`
    pub path: String,
    /// KV engine version. Defaults to v2.
    #[serde(default)]
    pub version: VaultKvVersion,
    /// Vault Enterprise namespace, sent as `X-Vault-Namespace`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Base64-encoded PEM bundle that replaces the default trust roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,
    /// Authentication. Exactly one method must be set.
    pub auth: VaultAuth,
}

/// KV secrets engine version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VaultKvVersion {
    V1,
    #[default]
    V2,
}

/// Vault authentication methods
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaultAuth {
    /// Static token read from a Secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_secret_ref: Option<SecretKeySelector>,
    /// AppRole login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_role: Option<VaultAppRole>,
    /// Kubernetes service account login
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<VaultKubernetesAuth>,
}

/// AppRole authentication
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaultAppRole {
    /// Mount path of the AppRole auth method
    #[serde(default = "default_approle_path")]
    pub path: String,
    /// Role ID
    pub role_id: String,
    /// Secret holding the secret ID
    pub secret_ref: SecretKeySelector,
}

/// Kubernetes authentication
#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaultKubernetesAuth {
    /// Mount path of the Kubernetes auth method
    #[serde(default = "default_kubernetes_path")]
    pub mount_path: String,
    /// Secret holding a service account JWT. When absent the controller's
    /// own projected token is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretKeySelector>,
    /// Vault role to log in as
    pub role: String,
}

fn default_approle_path() -> String {
    DEFAULT_VAULT_APPROLE_PATH.to_string()
}

fn default_kubernetes_path() -> String {
    DEFAULT_VAULT_KUBERNETES_PATH.to_string()
}
