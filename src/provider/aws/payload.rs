//! Decoding of `GetSecretValue` payloads

use std::collections::BTreeMap;

use crate::crd::RemoteReference;
use crate::provider::common::{json_object_to_bytes, select_property};
use crate::provider::ProviderError;

/// Raw value of a secret version
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretPayload {
    /// `SecretString`
    Text(String),
    /// `SecretBinary`
    Binary(Vec<u8>),
}

impl SecretPayload {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Text(text) => text.into_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    fn json_object(
        &self,
        reference: &RemoteReference,
    ) -> Result<serde_json::Map<String, serde_json::Value>, ProviderError> {
        match serde_json::from_slice(self.as_bytes()) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(_) => Err(ProviderError::read(reference, "secret is not a JSON object")),
            Err(e) => Err(ProviderError::read(
                reference,
                format!("secret is not valid JSON: {e}"),
            )),
        }
    }
}

/// Single value: the whole payload, or one field of its JSON object
pub fn secret_value(
    reference: &RemoteReference,
    payload: SecretPayload,
) -> Result<Vec<u8>, ProviderError> {
    if reference.property.is_none() {
        return Ok(payload.into_bytes());
    }
    let object = payload.json_object(reference)?;
    select_property(reference, object)
}

/// Map of every field of the payload's JSON object
pub fn secret_map(
    reference: &RemoteReference,
    payload: &SecretPayload,
) -> Result<BTreeMap<String, Vec<u8>>, ProviderError> {
    payload.json_object(reference).map(json_object_to_bytes)
}
