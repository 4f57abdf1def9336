//! # AWS Authentication
//!
//! Resolves credentials in order of precedence:
//! 1. static access keys read from Secrets
//! 2. an STS AssumeRole on top of the static keys or the ambient identity
//! 3. the ambient chain (environment, IRSA web identity, instance profile)
//!
//! Credentials are resolved eagerly so a misconfigured store fails at setup.

use std::time::SystemTime;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_credential_types::Credentials;
use aws_sdk_sts::error::DisplayErrorContext;
use tracing::info;

use crate::config::ProviderEndpoints;
use crate::constants::AWS_ASSUME_ROLE_SESSION_NAME;
use crate::crd::{AwsAuth, AwsStore};
use crate::provider::{CallContext, ProviderError, StoreContext};

/// Build the SDK configuration for a store and verify its credentials resolve.
///
/// # Errors
///
/// [`ProviderError::Setup`] when the referenced keys cannot be read, the
/// role cannot be assumed, no region is configured, or the credential chain
/// yields nothing.
pub async fn create_sdk_config(
    ctx: &CallContext,
    store: &StoreContext<'_>,
    config: &AwsStore,
    endpoints: &ProviderEndpoints,
) -> Result<SdkConfig, ProviderError> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = config.region.as_deref().filter(|r| !r.is_empty()) {
        loader = loader.region(Region::new(region.to_string()));
    }

    if let Some(credentials) = static_credentials(ctx, store, config.auth.as_ref()).await? {
        info!(provider = "aws", "Using static credentials from secret references");
        loader = loader.credentials_provider(credentials);
    }

    let base = loader.load().await;
    if base.region().is_none() {
        return Err(ProviderError::setup(
            "no AWS region configured on the store or in the environment",
        ));
    }

    let sdk_config = match config.role.as_deref().filter(|r| !r.is_empty()) {
        Some(role_arn) => assume_role(ctx, &base, role_arn, endpoints).await?,
        None => base,
    };

    let provider = sdk_config
        .credentials_provider()
        .ok_or_else(|| ProviderError::setup("no AWS credentials provider available"))?;
    ctx.run(async {
        provider
            .provide_credentials()
            .await
            .map(|_| ())
            .map_err(|e| {
                ProviderError::setup(format!(
                    "cannot resolve AWS credentials: {}",
                    DisplayErrorContext(&e)
                ))
            })
    })
    .await?;

    Ok(sdk_config)
}

/// Access keys from Secrets. Both selectors must be set, or neither.
async fn static_credentials(
    ctx: &CallContext,
    store: &StoreContext<'_>,
    auth: Option<&AwsAuth>,
) -> Result<Option<Credentials>, ProviderError> {
    let Some(auth) = auth else {
        return Ok(None);
    };
    match (
        &auth.access_key_id_secret_ref,
        &auth.secret_access_key_secret_ref,
    ) {
        (Some(key_id_ref), Some(secret_ref)) => {
            let access_key_id = store.secret_key_ref(ctx, key_id_ref).await?;
            let secret_access_key = store.secret_key_ref(ctx, secret_ref).await?;
            Ok(Some(Credentials::new(
                access_key_id.as_str(),
                secret_access_key.as_str(),
                None,
                None,
                "SecretStore",
            )))
        }
        (None, None) => Ok(None),
        _ => Err(ProviderError::setup(
            "AWS auth requires both accessKeyIdSecretRef and secretAccessKeySecretRef",
        )),
    }
}

/// Exchange the base identity for temporary role credentials
async fn assume_role(
    ctx: &CallContext,
    base: &SdkConfig,
    role_arn: &str,
    endpoints: &ProviderEndpoints,
) -> Result<SdkConfig, ProviderError> {
    let mut sts_config = aws_sdk_sts::config::Builder::from(base);
    if let Some(endpoint) = &endpoints.aws_sts {
        sts_config = sts_config.endpoint_url(endpoint);
    }
    let sts = aws_sdk_sts::Client::from_conf(sts_config.build());

    info!(provider = "aws", role_arn, "Assuming IAM role");
    let output = ctx
        .run(async {
            sts.assume_role()
                .role_arn(role_arn)
                .role_session_name(AWS_ASSUME_ROLE_SESSION_NAME)
                .send()
                .await
                .map_err(|e| {
                    ProviderError::setup(format!(
                        "cannot assume role {role_arn}: {}",
                        DisplayErrorContext(&e)
                    ))
                })
        })
        .await?;

    let credentials = output.credentials().ok_or_else(|| {
        ProviderError::setup(format!("AssumeRole for {role_arn} returned no credentials"))
    })?;
    let expiry = SystemTime::try_from(*credentials.expiration()).ok();
    let assumed = Credentials::new(
        credentials.access_key_id(),
        credentials.secret_access_key(),
        Some(credentials.session_token().to_string()),
        expiry,
        "AssumeRole",
    );

    Ok(base
        .to_builder()
        .credentials_provider(SharedCredentialsProvider::new(assumed))
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::reconciler::MockClusterApi;
    use crate::crd::{SecretKeySelector, StoreConfig, StoreKind};
    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> CallContext {
        CallContext::new(CancellationToken::new(), Duration::from_secs(5))
    }

    fn selector(key: &str) -> SecretKeySelector {
        SecretKeySelector {
            name: "aws-credentials".to_string(),
            key: key.to_string(),
            namespace: None,
        }
    }

    fn store_context<'a>(config: &'a StoreConfig, cluster: &'a MockClusterApi) -> StoreContext<'a> {
        StoreContext {
            config,
            kind: StoreKind::SecretStore,
            namespace: "billing",
            cluster,
        }
    }

    #[tokio::test]
    async fn test_static_credentials_from_both_selectors() {
        let mut cluster = MockClusterApi::new();
        cluster
            .expect_get_secret()
            .times(2)
            .returning(|namespace, name| {
                assert_eq!((namespace, name), ("billing", "aws-credentials"));
                Ok(Some(Secret {
                    data: Some(BTreeMap::from([
                        ("access-key-id".to_string(), ByteString(b"AKIAEXAMPLE".to_vec())),
                        ("secret-access-key".to_string(), ByteString(b"wJalrXUtnFEMI\n".to_vec())),
                    ])),
                    ..Secret::default()
                }))
            });
        let config = StoreConfig::default();
        let auth = AwsAuth {
            access_key_id_secret_ref: Some(selector("access-key-id")),
            secret_access_key_secret_ref: Some(selector("secret-access-key")),
        };

        let credentials = static_credentials(&ctx(), &store_context(&config, &cluster), Some(&auth))
            .await
            .unwrap()
            .expect("both selectors yield static credentials");
        assert_eq!(credentials.access_key_id(), "AKIAEXAMPLE");
        assert_eq!(credentials.secret_access_key(), "wJalrXUtnFEMI");
        assert!(credentials.session_token().is_none());
    }

    #[tokio::test]
    async fn test_one_sided_selector_is_setup_error() {
        // no Secret read happens before the shape is validated
        let cluster = MockClusterApi::new();
        let config = StoreConfig::default();
        let auth = AwsAuth {
            access_key_id_secret_ref: Some(selector("access-key-id")),
            secret_access_key_secret_ref: None,
        };

        let err = static_credentials(&ctx(), &store_context(&config, &cluster), Some(&auth))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Setup(_)));
        assert_eq!(
            err.to_string(),
            "AWS auth requires both accessKeyIdSecretRef and secretAccessKeySecretRef"
        );
    }

    #[tokio::test]
    async fn test_no_selectors_use_ambient_chain() {
        let cluster = MockClusterApi::new();
        let config = StoreConfig::default();
        let store = store_context(&config, &cluster);

        assert!(static_credentials(&ctx(), &store, None).await.unwrap().is_none());
        assert!(static_credentials(&ctx(), &store, Some(&AwsAuth::default()))
            .await
            .unwrap()
            .is_none());
    }
}
