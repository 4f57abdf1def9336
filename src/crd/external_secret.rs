//! # ExternalSecret
//!
//! The desired-state resource: which store to read from, which remote keys to
//! fetch and how to shape the generated Secret.

use schemars::{json_schema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

/// ExternalSecret Custom Resource Definition
///
/// Materializes a Kubernetes Secret with the same name and namespace from
/// values held in an external secret store.
///
/// # Example
///
/// ```yaml
/// apiVersion: secret-management.microscaler.io/v1alpha1
/// kind: ExternalSecret
/// metadata:
///   name: database-credentials
///   namespace: default
/// spec:
///   storeRef:
///     name: vault-backend
///     kind: SecretStore
///   dataFrom:
///     - name: apps/shared/database
///   data:
///     - secretKey: password
///       remoteRef:
///         name: apps/billing/database
///         property: password
///         version: "3"
///   template:
///     metadata:
///       annotations:
///         reloader.stakater.com/match: "true"
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "ExternalSecret",
    group = "secret-management.microscaler.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::ExternalSecretStatus",
    shortname = "es",
    printcolumn = r#"{"name":"Store", "type":"string", "jsonPath":".spec.storeRef.name"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}, {"name":"Reason", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].reason"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSecretSpec {
    /// Store the values are read from
    pub store_ref: StoreRef,
    /// Individual remote values mapped to keys of the generated Secret.
    /// Applied after `dataFrom`, so these keys win on conflict.
    #[serde(default)]
    pub data: Vec<ExternalSecretData>,
    /// Remote values that expand to a whole map of keys, merged in order
    #[serde(default)]
    pub data_from: Vec<RemoteReference>,
    /// Partial Secret object deep-merged over the generated Secret.
    /// Fields in the template win.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "template_schema")]
    pub template: Option<serde_json::Value>,
}

fn template_schema(_: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "description": "Partial Secret object deep-merged over the generated Secret",
        "x-kubernetes-preserve-unknown-fields": true
    })
}

/// Reference to a SecretStore or ClusterSecretStore
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreRef {
    /// Name of the store
    pub name: String,
    /// Kind of the store. Defaults to a namespaced `SecretStore`.
    #[serde(default)]
    pub kind: StoreKind,
}

/// Scope of a store reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum StoreKind {
    /// Namespaced store in the ExternalSecret's namespace
    #[default]
    SecretStore,
    /// Cluster-scoped store
    ClusterSecretStore,
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SecretStore => f.write_str("SecretStore"),
            Self::ClusterSecretStore => f.write_str("ClusterSecretStore"),
        }
    }
}

/// One key of the generated Secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSecretData {
    /// Key in the generated Secret
    pub secret_key: String,
    /// Where the value comes from
    pub remote_ref: RemoteReference,
}

/// Location of a value in an external store
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemoteReference {
    /// Backend-specific locator (Vault path, AWS secret id, GCP secret name)
    #[serde(alias = "path", alias = "key")]
    pub name: String,
    /// Field to select from a structured payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    /// Revision to read. Absent means the current version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl RemoteReference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl std::fmt::Display for RemoteReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)?;
        if let Some(property) = &self.property {
            write!(f, "#{property}")?;
        }
        if let Some(version) = &self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}
