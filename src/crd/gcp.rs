use serde::{Deserialize, Serialize};

use crate::crd::SecretKeySelector;

/// GCP Secret Manager store
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GcpStore {
    /// Project used to expand bare secret names. Falls back to the
    /// service account key's `project_id`.
    #[serde(
        rename = "projectID",
        alias = "projectId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub project_id: Option<String>,
    /// Credentials. When absent, ambient application credentials are used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<GcpAuth>,
}

/// GCP credential sources. At most one may be set.
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GcpAuth {
    /// Secret key holding a service account JSON key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretKeySelector>,
    /// Path to a service account JSON key on the controller's filesystem
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<String>,
}
