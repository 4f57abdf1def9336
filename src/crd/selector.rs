use serde::{Deserialize, Serialize};

/// Reference to a single key inside a Kubernetes Secret
///
/// `namespace` is only honoured for cluster-scoped stores. A namespaced
/// `SecretStore` always resolves selectors in the ExternalSecret's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Name of the Secret
    pub name: String,
    /// Key within the Secret's data
    pub key: String,
    /// Namespace of the Secret (ClusterSecretStore only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}
