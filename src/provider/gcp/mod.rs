//! # GCP Secret Manager Backend
//!
//! Native REST implementation of `projects.secrets.versions.access`.
//! Uses reqwest for HTTP requests and OAuth2 for authentication.
//!
//! Payloads are opaque bytes: `remoteRef.property` is not applied, and
//! `dataFrom` yields a single entry keyed by the reference name.
//!
//! References:
//! - [GCP Secret Manager REST API v1](https://cloud.google.com/secret-manager/docs/reference/rest)

mod auth;
mod path;
mod responses;

pub use auth::{GcpCredentials, ServiceAccountKey};
pub use path::version_name;

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, info_span, Instrument};
use zeroize::Zeroizing;

use crate::config::ProviderEndpoints;
use crate::constants::DEFAULT_GCP_SECRET_MANAGER_ENDPOINT;
use crate::crd::{RemoteReference, StoreProvider};
use crate::provider::common::record_operation;
use crate::provider::{
    CallContext, ClientFactory, ProviderError, SecretStoreClient, StoreContext,
};

use responses::{AccessSecretVersionResponse, GcpErrorResponse};

const PROVIDER: &str = "gcp";

/// Builds [`GcpSecretManager`] clients for stores with a `gcp` block
#[derive(Debug, Clone, Default)]
pub struct GcpFactory {
    endpoints: ProviderEndpoints,
}

impl GcpFactory {
    pub fn new(endpoints: ProviderEndpoints) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl ClientFactory for GcpFactory {
    async fn new_client(
        &self,
        ctx: &CallContext,
        store: &StoreContext<'_>,
    ) -> Result<Box<dyn SecretStoreClient>, ProviderError> {
        let StoreProvider::Gcp(config) = store
            .config
            .provider()
            .map_err(|e| ProviderError::setup(e.to_string()))?
        else {
            return Err(ProviderError::setup("store has no gcp configuration"));
        };

        let credentials = GcpCredentials::resolve(ctx, store, config).await?;
        let http_client = Client::builder()
            .build()
            .map_err(|e| ProviderError::setup(format!("failed to create HTTP client: {e}")))?;
        let access_token = auth::access_token(ctx, &http_client, &credentials).await?;

        let project_id = config
            .project_id
            .clone()
            .filter(|p| !p.is_empty())
            .or(access_token.project_id);
        let base_url = self
            .endpoints
            .gcp_secret_manager
            .clone()
            .unwrap_or_else(|| DEFAULT_GCP_SECRET_MANAGER_ENDPOINT.to_string());

        info!(
            provider = PROVIDER,
            project_id = ?project_id,
            credentials = ?credentials,
            "Initialized GCP Secret Manager client"
        );
        Ok(Box::new(GcpSecretManager {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project_id,
            access_token: access_token.token,
        }))
    }
}

/// GCP Secret Manager REST client
pub struct GcpSecretManager {
    http_client: Client,
    base_url: String,
    project_id: Option<String>,
    access_token: Zeroizing<String>,
}

impl std::fmt::Debug for GcpSecretManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpSecretManager")
            .field("project_id", &self.project_id)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GcpSecretManager {
    /// Client with an already obtained access token
    ///
    /// # Errors
    ///
    /// [`ProviderError::Setup`] if the HTTP client cannot be built.
    pub fn from_token(
        base_url: impl Into<String>,
        project_id: Option<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .build()
            .map_err(|e| ProviderError::setup(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id,
            access_token: Zeroizing::new(access_token.into()),
        })
    }

    /// Access a secret version and return its decoded payload
    async fn access(
        &self,
        ctx: &CallContext,
        reference: &RemoteReference,
    ) -> Result<Vec<u8>, ProviderError> {
        let name = version_name(reference, self.project_id.as_deref())?;
        let url = format!("{}/v1/{name}:access", self.base_url);
        debug!(provider = PROVIDER, secret = %name, "Accessing GCP secret version");

        let response = ctx
            .run(async {
                let response = self
                    .http_client
                    .get(&url)
                    .bearer_auth(self.access_token.as_str())
                    .send()
                    .await
                    .map_err(|e| ProviderError::read(reference, e))?;
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .map_err(|e| ProviderError::read(reference, e))?;
                if !status.is_success() {
                    return Err(ProviderError::read(reference, error_message(status, &text)));
                }
                serde_json::from_str::<AccessSecretVersionResponse>(&text)
                    .map_err(|e| ProviderError::read(reference, e))
            })
            .await?;

        general_purpose::STANDARD
            .decode(response.payload.data.as_bytes())
            .map_err(|e| ProviderError::read(reference, format!("invalid payload encoding: {e}")))
    }
}

#[async_trait]
impl SecretStoreClient for GcpSecretManager {
    async fn get_secret(
        &self,
        ctx: &CallContext,
        reference: &RemoteReference,
    ) -> Result<Vec<u8>, ProviderError> {
        let span = info_span!("gcp.secret.get", secret.name = %reference.name);
        let start = Instant::now();

        let result = self.access(ctx, reference).instrument(span).await;

        record_operation(PROVIDER, "get_secret", start, &result);
        result
    }

    async fn get_secret_map(
        &self,
        ctx: &CallContext,
        reference: &RemoteReference,
    ) -> Result<BTreeMap<String, Vec<u8>>, ProviderError> {
        let span = info_span!("gcp.secret.get_map", secret.name = %reference.name);
        let start = Instant::now();

        let result = self
            .access(ctx, reference)
            .instrument(span)
            .await
            .map(|payload| BTreeMap::from([(reference.name.clone(), payload)]));

        record_operation(PROVIDER, "get_secret_map", start, &result);
        result
    }
}

/// Handle GCP API error responses
fn error_message(status: StatusCode, text: &str) -> String {
    match serde_json::from_str::<GcpErrorResponse>(text) {
        Ok(body) => format!(
            "GCP API error: {} (code: {}, status: {})",
            body.error.message, body.error.code, body.error.status
        ),
        Err(_) => format!("HTTP {}: {}", status.as_u16(), text.trim()),
    }
}
