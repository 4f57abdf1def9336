//! # Vault Authentication
//!
//! Resolves the store's single auth method into credentials. Reading
//! referenced Secrets happens here; the network login happens in
//! [`VaultClient::connect`](super::VaultClient::connect).

use tracing::debug;
use zeroize::Zeroizing;

use crate::constants::{
    DEFAULT_VAULT_APPROLE_PATH, DEFAULT_VAULT_KUBERNETES_PATH, SERVICE_ACCOUNT_TOKEN_PATH,
};
use crate::crd::VaultAuth;
use crate::provider::{CallContext, ProviderError, StoreContext};

/// Credentials for one of the three supported auth methods
pub enum VaultCredentials {
    /// Static token, used as-is
    Token(Zeroizing<String>),
    /// AppRole login at `/v1/auth/{path}/login`
    AppRole {
        path: String,
        role_id: String,
        secret_id: Zeroizing<String>,
    },
    /// Kubernetes login at `/v1/auth/{mount_path}/login`
    Kubernetes {
        mount_path: String,
        role: String,
        jwt: Zeroizing<String>,
    },
}

impl std::fmt::Debug for VaultCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(..)"),
            Self::AppRole { path, role_id, .. } => f
                .debug_struct("AppRole")
                .field("path", path)
                .field("role_id", role_id)
                .finish_non_exhaustive(),
            Self::Kubernetes {
                mount_path, role, ..
            } => f
                .debug_struct("Kubernetes")
                .field("mount_path", mount_path)
                .field("role", role)
                .finish_non_exhaustive(),
        }
    }
}

impl VaultCredentials {
    /// Name of the auth method, for logs
    pub fn method(&self) -> &'static str {
        match self {
            Self::Token(_) => "token",
            Self::AppRole { .. } => "appRole",
            Self::Kubernetes { .. } => "kubernetes",
        }
    }

    /// Resolve credentials from the store's auth block.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Setup`] unless exactly one method is configured and
    /// its referenced Secret keys can be read.
    pub async fn resolve(
        ctx: &CallContext,
        store: &StoreContext<'_>,
        auth: &VaultAuth,
    ) -> Result<Self, ProviderError> {
        match (&auth.token_secret_ref, &auth.app_role, &auth.kubernetes) {
            (Some(token_ref), None, None) => {
                let token = store.secret_key_ref(ctx, token_ref).await?;
                Ok(Self::Token(token))
            }
            (None, Some(app_role), None) => {
                let secret_id = store.secret_key_ref(ctx, &app_role.secret_ref).await?;
                Ok(Self::AppRole {
                    path: mount_or_default(&app_role.path, DEFAULT_VAULT_APPROLE_PATH),
                    role_id: app_role.role_id.trim().to_string(),
                    secret_id,
                })
            }
            (None, None, Some(kubernetes)) => {
                let jwt = match &kubernetes.secret_ref {
                    Some(jwt_ref) => store.secret_key_ref(ctx, jwt_ref).await?,
                    None => service_account_token().await?,
                };
                Ok(Self::Kubernetes {
                    mount_path: mount_or_default(
                        &kubernetes.mount_path,
                        DEFAULT_VAULT_KUBERNETES_PATH,
                    ),
                    role: kubernetes.role.clone(),
                    jwt,
                })
            }
            (None, None, None) => Err(ProviderError::setup(
                "vault store does not configure an auth method",
            )),
            _ => Err(ProviderError::setup(
                "vault store configures more than one auth method",
            )),
        }
    }
}

/// An empty mount means the auth method's default mount
fn mount_or_default(mount: &str, default: &str) -> String {
    let mount = mount.trim().trim_matches('/');
    let mount = if mount.is_empty() { default } else { mount };
    mount.to_string()
}

/// The controller pod's projected service account token
async fn service_account_token() -> Result<Zeroizing<String>, ProviderError> {
    debug!(path = SERVICE_ACCOUNT_TOKEN_PATH, "reading service account token");
    let token = tokio::fs::read_to_string(SERVICE_ACCOUNT_TOKEN_PATH)
        .await
        .map_err(|e| {
            ProviderError::setup(format!(
                "cannot read service account token {SERVICE_ACCOUNT_TOKEN_PATH}: {e}"
            ))
        })?;
    Ok(Zeroizing::new(token.trim().to_string()))
}
