//! # AWS Secrets Manager Backend
//!
//! Reads secrets with `GetSecretValue`. `remoteRef.version` selects a
//! version stage (defaults to `AWSCURRENT` server-side).

mod auth;
mod payload;

pub use auth::create_sdk_config;
pub use payload::SecretPayload;

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use aws_sdk_secretsmanager::Client;
use tracing::{debug, info_span, Instrument};

use crate::config::ProviderEndpoints;
use crate::crd::{RemoteReference, StoreProvider};
use crate::provider::common::record_operation;
use crate::provider::{
    CallContext, ClientFactory, ProviderError, SecretStoreClient, StoreContext,
};

const PROVIDER: &str = "aws";

/// Builds [`AwsSecretsManager`] clients for stores with an `aws` block
#[derive(Debug, Clone, Default)]
pub struct AwsFactory {
    endpoints: ProviderEndpoints,
}

impl AwsFactory {
    pub fn new(endpoints: ProviderEndpoints) -> Self {
        Self { endpoints }
    }
}

#[async_trait]
impl ClientFactory for AwsFactory {
    async fn new_client(
        &self,
        ctx: &CallContext,
        store: &StoreContext<'_>,
    ) -> Result<Box<dyn SecretStoreClient>, ProviderError> {
        let StoreProvider::Aws(config) = store
            .config
            .provider()
            .map_err(|e| ProviderError::setup(e.to_string()))?
        else {
            return Err(ProviderError::setup("store has no aws configuration"));
        };

        let sdk_config = create_sdk_config(ctx, store, config, &self.endpoints).await?;
        let mut builder = aws_sdk_secretsmanager::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &self.endpoints.aws_secrets_manager {
            builder = builder.endpoint_url(endpoint);
        }

        let region = sdk_config
            .region()
            .map(ToString::to_string)
            .unwrap_or_default();
        Ok(Box::new(AwsSecretsManager {
            client: Client::from_conf(builder.build()),
            region,
        }))
    }
}

/// AWS Secrets Manager client
pub struct AwsSecretsManager {
    client: Client,
    region: String,
}

impl std::fmt::Debug for AwsSecretsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSecretsManager")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl AwsSecretsManager {
    async fn fetch(
        &self,
        ctx: &CallContext,
        reference: &RemoteReference,
    ) -> Result<SecretPayload, ProviderError> {
        debug!(
            provider = PROVIDER,
            region = %self.region,
            secret_id = %reference.name,
            version_stage = ?reference.version,
            "Fetching AWS secret"
        );

        let output = ctx
            .run(async {
                self.client
                    .get_secret_value()
                    .secret_id(&reference.name)
                    .set_version_stage(reference.version.clone())
                    .send()
                    .await
                    .map_err(|e| ProviderError::read(reference, DisplayErrorContext(&e)))
            })
            .await?;

        if let Some(text) = output.secret_string() {
            Ok(SecretPayload::Text(text.to_string()))
        } else if let Some(binary) = output.secret_binary() {
            Ok(SecretPayload::Binary(binary.as_ref().to_vec()))
        } else {
            Err(ProviderError::read(reference, "secret has no value"))
        }
    }
}

#[async_trait]
impl SecretStoreClient for AwsSecretsManager {
    async fn get_secret(
        &self,
        ctx: &CallContext,
        reference: &RemoteReference,
    ) -> Result<Vec<u8>, ProviderError> {
        let span = info_span!(
            "aws.secret.get",
            secret.name = %reference.name,
            region = %self.region
        );
        let start = Instant::now();

        let result = async {
            let secret = self.fetch(ctx, reference).await?;
            payload::secret_value(reference, secret)
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
        let span = info_span!(
            "aws.secret.get_map",
            secret.name = %reference.name,
            region = %self.region
        );
        let start = Instant::now();

        let result = async {
            let secret = self.fetch(ctx, reference).await?;
            payload::secret_map(reference, &secret)
        }
        .instrument(span)
        .await;

        record_operation(PROVIDER, "get_secret_map", start, &result);
        result
    }
}
