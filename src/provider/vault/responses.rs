//! Vault API response types

use serde::Deserialize;

/// Response of `POST /v1/auth/{mount}/login`
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub auth: Option<LoginAuth>,
}

#[derive(Debug, Deserialize)]
pub struct LoginAuth {
    #[serde(default)]
    pub client_token: String,
}

/// Error body returned by Vault on non-2xx responses
#[derive(Debug, Deserialize)]
pub struct VaultErrorResponse {
    #[serde(default)]
    pub errors: Vec<String>,
}
