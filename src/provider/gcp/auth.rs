//! # GCP Authentication
//!
//! Credential sources, at most one per store:
//! - ambient: metadata server (Workload Identity / GCE), then the key file
//!   named by `GOOGLE_APPLICATION_CREDENTIALS`
//! - a service account key file on the controller's filesystem
//! - a service account key stored in a Secret
//!
//! Service account keys are exchanged for an access token with the OAuth2
//! JWT bearer grant.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zeroize::Zeroizing;

use super::responses::TokenResponse;
use crate::constants::{GCP_CLOUD_PLATFORM_SCOPE, GCP_METADATA_TOKEN_URL};
use crate::crd::GcpStore;
use crate::provider::{CallContext, ProviderError, StoreContext};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const JWT_LIFETIME_SECS: u64 = 3600;

/// Where the access token comes from
pub enum GcpCredentials {
    Ambient,
    File(String),
    Json(Zeroizing<String>),
}

impl std::fmt::Debug for GcpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ambient => f.write_str("Ambient"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Json(_) => f.write_str("Json(..)"),
        }
    }
}

impl GcpCredentials {
    /// Pick the credential source of a store.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Setup`] when more than one source is configured or
    /// the referenced Secret cannot be read.
    pub async fn resolve(
        ctx: &CallContext,
        store: &StoreContext<'_>,
        config: &GcpStore,
    ) -> Result<Self, ProviderError> {
        let Some(auth) = &config.auth else {
            return Ok(Self::Ambient);
        };
        match (&auth.secret_ref, auth.credentials_file.as_deref()) {
            (Some(_), Some(_)) => Err(ProviderError::setup(
                "multiple authentication methods configured",
            )),
            (Some(secret_ref), None) => Ok(Self::Json(store.secret_key_ref(ctx, secret_ref).await?)),
            (None, Some(path)) if !path.trim().is_empty() => Ok(Self::File(path.trim().to_string())),
            (None, _) => Ok(Self::Ambient),
        }
    }
}

/// Service account key fields used for the JWT bearer grant
#[derive(Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

impl Drop for ServiceAccountKey {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.private_key);
    }
}

impl ServiceAccountKey {
    /// Parse a JSON key.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Setup`] when the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        serde_json::from_str(json)
            .map_err(|e| ProviderError::setup(format!("invalid service account key: {e}")))
    }

    fn token_uri(&self) -> &str {
        self.token_uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .unwrap_or(DEFAULT_TOKEN_URI)
    }

    /// Signed RS256 assertion for the token endpoint
    fn assertion(&self, now: u64) -> Result<String, ProviderError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid.clone_from(&self.private_key_id);

        let claims = Claims {
            iss: &self.client_email,
            scope: GCP_CLOUD_PLATFORM_SCOPE,
            aud: self.token_uri(),
            iat: now,
            exp: now + JWT_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| ProviderError::setup(format!("invalid service account private key: {e}")))?;
        encode(&header, &claims, &key)
            .map_err(|e| ProviderError::setup(format!("cannot sign service account JWT: {e}")))
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

/// Access token plus the key's project, when a key was used
#[derive(Debug)]
pub struct AccessToken {
    pub token: Zeroizing<String>,
    pub project_id: Option<String>,
}

/// Obtain an access token for the resolved credentials.
///
/// # Errors
///
/// [`ProviderError::Setup`] when no source yields a token.
pub async fn access_token(
    ctx: &CallContext,
    http_client: &Client,
    credentials: &GcpCredentials,
) -> Result<AccessToken, ProviderError> {
    match credentials {
        GcpCredentials::Json(json) => {
            let key = ServiceAccountKey::from_json(json)?;
            exchange_key(ctx, http_client, &key).await
        }
        GcpCredentials::File(path) => {
            let key = read_key_file(path).await?;
            exchange_key(ctx, http_client, &key).await
        }
        GcpCredentials::Ambient => ambient_token(ctx, http_client).await,
    }
}

async fn read_key_file(path: &str) -> Result<ServiceAccountKey, ProviderError> {
    let json = Zeroizing::new(tokio::fs::read_to_string(path).await.map_err(|e| {
        ProviderError::setup(format!("cannot read credentials file {path}: {e}"))
    })?);
    ServiceAccountKey::from_json(&json)
}

/// Metadata server first, then `GOOGLE_APPLICATION_CREDENTIALS`
async fn ambient_token(ctx: &CallContext, http_client: &Client) -> Result<AccessToken, ProviderError> {
    let metadata = ctx
        .run(async {
            let response = http_client
                .get(GCP_METADATA_TOKEN_URL)
                .header("Metadata-Flavor", "Google")
                .send()
                .await
                .map_err(|e| ProviderError::setup(format!("metadata server not available: {e}")))?;
            if !response.status().is_success() {
                return Err(ProviderError::setup(format!(
                    "metadata server returned {}",
                    response.status()
                )));
            }
            response
                .json::<TokenResponse>()
                .await
                .map_err(|e| ProviderError::setup(format!("invalid metadata token response: {e}")))
        })
        .await;

    match metadata {
        Ok(token) => {
            info!(provider = "gcp", "Retrieved access token from metadata server");
            Ok(AccessToken {
                token: Zeroizing::new(token.access_token),
                project_id: None,
            })
        }
        Err(ProviderError::Cancelled) => Err(ProviderError::Cancelled),
        Err(metadata_error) => {
            debug!(provider = "gcp", error = %metadata_error, "metadata server token unavailable");
            let Some(path) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS")
                .ok()
                .filter(|p| !p.is_empty())
            else {
                return Err(ProviderError::setup(format!(
                    "no ambient GCP credentials: {metadata_error}; GOOGLE_APPLICATION_CREDENTIALS is not set"
                )));
            };
            let key = read_key_file(&path).await?;
            exchange_key(ctx, http_client, &key).await
        }
    }
}

/// JWT bearer grant against the key's token endpoint
async fn exchange_key(
    ctx: &CallContext,
    http_client: &Client,
    key: &ServiceAccountKey,
) -> Result<AccessToken, ProviderError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| ProviderError::setup(format!("system clock before epoch: {e}")))?
        .as_secs();
    let assertion = Zeroizing::new(key.assertion(now)?);

    let token = ctx
        .run(async {
            let response = http_client
                .post(key.token_uri())
                .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
                .send()
                .await
                .map_err(|e| ProviderError::setup(format!("token request failed: {e}")))?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::setup(format!(
                    "token endpoint returned HTTP {}: {}",
                    status.as_u16(),
                    body.trim()
                )));
            }
            response
                .json::<TokenResponse>()
                .await
                .map_err(|e| ProviderError::setup(format!("invalid token response: {e}")))
        })
        .await?;

    info!(
        provider = "gcp",
        service_account = %key.client_email,
        "Exchanged service account key for access token"
    );
    Ok(AccessToken {
        token: Zeroizing::new(token.access_token),
        project_id: key.project_id.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::MockClusterApi;
    use crate::crd::{GcpAuth, SecretKeySelector, StoreConfig, StoreKind};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> CallContext {
        CallContext::new(CancellationToken::new(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_json_and_file_are_mutually_exclusive() {
        let cluster = MockClusterApi::new();
        let store_config = StoreConfig::default();
        let store = StoreContext {
            config: &store_config,
            kind: StoreKind::SecretStore,
            namespace: "default",
            cluster: &cluster,
        };
        let config = GcpStore {
            project_id: Some("acme".to_string()),
            auth: Some(GcpAuth {
                secret_ref: Some(SecretKeySelector {
                    name: "gcp".to_string(),
                    key: "key.json".to_string(),
                    namespace: None,
                }),
                credentials_file: Some("/etc/gcp/key.json".to_string()),
            }),
        };

        let err = GcpCredentials::resolve(&ctx(), &store, &config).await.unwrap_err();
        assert_eq!(err.to_string(), "multiple authentication methods configured");
    }

    #[tokio::test]
    async fn test_no_auth_is_ambient() {
        let cluster = MockClusterApi::new();
        let store_config = StoreConfig::default();
        let store = StoreContext {
            config: &store_config,
            kind: StoreKind::SecretStore,
            namespace: "default",
            cluster: &cluster,
        };

        let credentials = GcpCredentials::resolve(&ctx(), &store, &GcpStore::default())
            .await
            .unwrap();
        assert!(matches!(credentials, GcpCredentials::Ambient));
    }

    #[test]
    fn test_service_account_key_defaults_token_uri() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email":"sa@acme.iam.gserviceaccount.com","private_key":"x","project_id":"acme"}"#,
        )
        .unwrap();
        assert_eq!(key.token_uri(), "https://oauth2.googleapis.com/token");
        assert_eq!(key.project_id.as_deref(), Some("acme"));
        assert!(!format!("{key:?}").contains("private_key"));
    }

    #[test]
    fn test_invalid_private_key_is_setup_error() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email":"sa@acme.iam.gserviceaccount.com","private_key":"not a pem"}"#,
        )
        .unwrap();
        let err = key.assertion(1_700_000_000).unwrap_err();
        assert!(err.to_string().starts_with("invalid service account private key"));
    }
}
