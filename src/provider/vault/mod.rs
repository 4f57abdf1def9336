//! # HashiCorp Vault KV Backend
//!
//! REST client for the KV secrets engine (v1 and v2). Uses reqwest with
//! rustls; a store's `caBundle` replaces the built-in trust roots.
//!
//! A client logs in once at construction (AppRole or Kubernetes auth) or
//! uses a static token, then sends `X-Vault-Token` on every read.
//!
//! References:
//! - [KV v2 API](https://developer.hashicorp.com/vault/api-docs/secret/kv/kv-v2)
//! - [AppRole API](https://developer.hashicorp.com/vault/api-docs/auth/approle)
//! - [Kubernetes auth API](https://developer.hashicorp.com/vault/api-docs/auth/kubernetes)

mod auth;
mod kv;
mod requests;
mod responses;

pub use auth::VaultCredentials;

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use tracing::{debug, info, info_span, Instrument};
use zeroize::Zeroizing;

use crate::crd::{RemoteReference, StoreProvider, VaultKvVersion, VaultStore};
use crate::provider::common::{json_object_to_bytes, record_operation, select_property};
use crate::provider::{
    CallContext, ClientFactory, ProviderError, SecretStoreClient, StoreContext,
};

use requests::{AppRoleLogin, KubernetesLogin};
use responses::{LoginResponse, VaultErrorResponse};

const PROVIDER: &str = "vault";

/// Builds [`VaultClient`]s for stores with a `vault` block
#[derive(Debug, Clone, Copy, Default)]
pub struct VaultFactory;

#[async_trait]
impl ClientFactory for VaultFactory {
    async fn new_client(
        &self,
        ctx: &CallContext,
        store: &StoreContext<'_>,
    ) -> Result<Box<dyn SecretStoreClient>, ProviderError> {
        let StoreProvider::Vault(config) = store
            .config
            .provider()
            .map_err(|e| ProviderError::setup(e.to_string()))?
        else {
            return Err(ProviderError::setup("store has no vault configuration"));
        };

        let credentials = VaultCredentials::resolve(ctx, store, &config.auth).await?;
        let client = VaultClient::connect(ctx, config, credentials).await?;
        Ok(Box::new(client))
    }
}

/// Authenticated Vault KV client
pub struct VaultClient {
    http_client: Client,
    server: String,
    mount: String,
    version: VaultKvVersion,
    namespace: Option<String>,
    token: Zeroizing<String>,
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("server", &self.server)
            .field("mount", &self.mount)
            .field("version", &self.version)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl VaultClient {
    /// Build the HTTP client and obtain a session token.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Setup`] when the CA bundle is invalid, the login is
    /// rejected, or Vault returns no token.
    pub async fn connect(
        ctx: &CallContext,
        config: &VaultStore,
        credentials: VaultCredentials,
    ) -> Result<Self, ProviderError> {
        let mut client = Self {
            http_client: build_http_client(config.ca_bundle.as_deref())?,
            server: config.server.trim_end_matches('/').to_string(),
            mount: config.path.clone(),
            version: config.version,
            namespace: config.namespace.clone().filter(|ns| !ns.is_empty()),
            token: Zeroizing::new(String::new()),
        };

        let method = credentials.method();
        let token = match credentials {
            VaultCredentials::Token(token) => token,
            VaultCredentials::AppRole {
                path,
                role_id,
                secret_id,
            } => {
                let body = AppRoleLogin {
                    role_id: &role_id,
                    secret_id: &secret_id,
                };
                client.login(ctx, &path, &body).await?
            }
            VaultCredentials::Kubernetes {
                mount_path,
                role,
                jwt,
            } => {
                let body = KubernetesLogin {
                    role: &role,
                    jwt: &jwt,
                };
                client.login(ctx, &mount_path, &body).await?
            }
        };

        if token.trim().is_empty() {
            return Err(ProviderError::setup(format!(
                "vault {method} authentication returned no token"
            )));
        }
        client.token = token;

        info!(
            provider = PROVIDER,
            server = %client.server,
            auth = method,
            "Authenticated to Vault"
        );
        Ok(client)
    }

    /// POST a login body to `/v1/auth/{mount}/login` and return the client token
    async fn login<B: Serialize + Sync>(
        &self,
        ctx: &CallContext,
        mount: &str,
        body: &B,
    ) -> Result<Zeroizing<String>, ProviderError> {
        let url = format!("{}/v1/auth/{}/login", self.server, mount.trim_matches('/'));
        let start = Instant::now();

        let result = ctx
            .run(async {
                let response = self
                    .with_namespace(self.http_client.post(&url))
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| ProviderError::setup(format!("vault login request failed: {e}")))?;

                let status = response.status();
                let text = response.text().await.map_err(|e| {
                    ProviderError::setup(format!("cannot read vault login response: {e}"))
                })?;
                if !status.is_success() {
                    return Err(ProviderError::setup(format!(
                        "vault login failed: {}",
                        error_message(status, &text)
                    )));
                }

                let login: LoginResponse = serde_json::from_str(&text).map_err(|e| {
                    ProviderError::setup(format!("cannot parse vault login response: {e}"))
                })?;
                Ok(Zeroizing::new(
                    login.auth.map(|auth| auth.client_token).unwrap_or_default(),
                ))
            })
            .await;

        record_operation(PROVIDER, "login", start, &result);
        result
    }

    fn with_namespace(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.namespace {
            Some(namespace) => request.header("X-Vault-Namespace", namespace),
            None => request,
        }
    }

    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        self.with_namespace(request)
            .header("X-Vault-Token", self.token.as_str())
    }

    /// Read the key/value map at `reference.name`
    async fn read(
        &self,
        ctx: &CallContext,
        reference: &RemoteReference,
    ) -> Result<serde_json::Map<String, serde_json::Value>, ProviderError> {
        let url = format!(
            "{}{}",
            self.server,
            kv::read_path(self.version, &self.mount, &reference.name)
        );

        let mut request = self.authenticated(self.http_client.get(&url));
        if let Some(version) = reference.version.as_deref() {
            if self.version == VaultKvVersion::V1 {
                return Err(ProviderError::read(
                    reference,
                    "KV v1 does not support versioned reads",
                ));
            }
            request = request.query(&[("version", version)]);
        }

        debug!(provider = PROVIDER, url = %url, "Reading Vault secret");
        ctx.run(async {
            let response = request
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

            let body: serde_json::Value =
                serde_json::from_str(&text).map_err(|e| ProviderError::read(reference, e))?;
            kv::unwrap_data(self.version, body).map_err(|e| ProviderError::read(reference, e))
        })
        .await
    }
}

#[async_trait]
impl SecretStoreClient for VaultClient {
    async fn get_secret(
        &self,
        ctx: &CallContext,
        reference: &RemoteReference,
    ) -> Result<Vec<u8>, ProviderError> {
        let span = info_span!("vault.secret.get", secret.name = %reference.name);
        let start = Instant::now();

        let result = async {
            let data = self.read(ctx, reference).await?;
            select_property(reference, data)
        }
        .instrument(span)
        .await;

        record_operation(PROVIDER, "get_secret", start, &result);
        result
    }

    async fn get_secret_map(
        &self,
        ctx: &CallContext,
        reference: &RemoteReference,
    ) -> Result<BTreeMap<String, Vec<u8>>, ProviderError> {
        let span = info_span!("vault.secret.get_map", secret.name = %reference.name);
        let start = Instant::now();

        let result = self
            .read(ctx, reference)
            .instrument(span)
            .await
            .map(json_object_to_bytes);

        record_operation(PROVIDER, "get_secret_map", start, &result);
        result
    }
}

/// HTTP client trusting either the built-in roots or only the store's bundle
fn build_http_client(ca_bundle: Option<&str>) -> Result<Client, ProviderError> {
    let mut builder = Client::builder();

    if let Some(bundle) = ca_bundle.map(str::trim).filter(|b| !b.is_empty()) {
        let pem = decode_ca_bundle(bundle)?;
        let certificates = reqwest::Certificate::from_pem_bundle(&pem)
            .map_err(|e| ProviderError::setup(format!("invalid vault caBundle: {e}")))?;
        if certificates.is_empty() {
            return Err(ProviderError::setup("vault caBundle contains no certificates"));
        }
        builder = builder.tls_built_in_root_certs(false);
        for certificate in certificates {
            builder = builder.add_root_certificate(certificate);
        }
    }

    builder
        .build()
        .map_err(|e| ProviderError::setup(format!("failed to create HTTP client: {e}")))
}

/// Accepts the bundle base64-encoded (as stored in the CRD) or as raw PEM
fn decode_ca_bundle(bundle: &str) -> Result<Vec<u8>, ProviderError> {
    if bundle.starts_with("-----BEGIN") {
        return Ok(bundle.as_bytes().to_vec());
    }
    general_purpose::STANDARD
        .decode(bundle)
        .map_err(|e| ProviderError::setup(format!("vault caBundle is not valid base64: {e}")))
}

/// Render a Vault error body, falling back to the raw text
fn error_message(status: StatusCode, text: &str) -> String {
    match serde_json::from_str::<VaultErrorResponse>(text) {
        Ok(body) if !body.errors.is_empty() => {
            format!("HTTP {}: {}", status.as_u16(), body.errors.join("; "))
        }
        _ => format!("HTTP {}: {}", status.as_u16(), text.trim()),
    }
}
