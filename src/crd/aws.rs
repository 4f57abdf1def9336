use serde::{Deserialize, Serialize};

use crate::crd::SecretKeySelector;

/// AWS Secrets Manager store
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsStore {
    /// AWS region. Falls back to the ambient region configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// IAM role ARN assumed through STS on top of the base identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Static credentials. When absent the ambient credential chain is used
    /// (environment, IRSA web identity, instance profile).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AwsAuth>,
}

/// Static access key credentials read from Secrets
#[derive(Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AwsAuth {
    /// Secret key holding the access key ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id_secret_ref: Option<SecretKeySelector>,
    /// Secret key holding the secret access key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key_secret_ref: Option<SecretKeySelector>,
}
