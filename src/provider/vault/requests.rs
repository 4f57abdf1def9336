//! Vault API request bodies

use serde::Serialize;

/// AppRole login body
#[derive(Serialize)]
pub struct AppRoleLogin<'a> {
    pub role_id: &'a str,
    pub secret_id: &'a str,
}

/// Kubernetes auth login body
#[derive(Serialize)]
pub struct KubernetesLogin<'a> {
    pub role: &'a str,
    pub jwt: &'a str,
}
