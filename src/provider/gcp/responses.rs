//! GCP API response types

use serde::Deserialize;

/// OAuth2 token response (metadata server and token endpoint)
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// Response of `versions/*:access`
#[derive(Debug, Deserialize)]
pub struct AccessSecretVersionResponse {
    pub payload: SecretPayload,
}

#[derive(Debug, Deserialize)]
pub struct SecretPayload {
    /// Base64-encoded secret data
    pub data: String,
}

/// GCP API error response
#[derive(Debug, Deserialize)]
pub struct GcpErrorResponse {
    pub error: GcpError,
}

#[derive(Debug, Deserialize)]
pub struct GcpError {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}
