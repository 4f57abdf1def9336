//! # Common Provider Utilities
//!
//! Shared pieces used by every backend: the per-call cancellation and
//! deadline wrapper, resolution of Secret key selectors, and decoding of
//! JSON payloads into byte maps.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::debug;
use zeroize::Zeroizing;

use crate::controller::reconciler::ClusterApi;
use crate::crd::{RemoteReference, SecretKeySelector, StoreConfig, StoreKind};
use crate::observability::metrics;
use crate::provider::ProviderError;

/// Cancellation and deadline for the remote calls of one reconcile
#[derive(Debug, Clone)]
pub struct CallContext {
    token: CancellationToken,
    timeout: Duration,
}

impl CallContext {
    pub fn new(token: CancellationToken, timeout: Duration) -> Self {
        Self { token, timeout }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run one remote call, aborting on cancellation or after the deadline.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Cancelled`], [`ProviderError::Timeout`], or the
    /// call's own error.
    pub async fn run<T, F>(&self, call: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(ProviderError::Cancelled),
            result = tokio::time::timeout(self.timeout, call) => match result {
                Ok(inner) => inner,
                Err(_elapsed) => Err(ProviderError::Timeout(self.timeout)),
            },
        }
    }
}

/// Everything a factory needs to build a client for one store
#[derive(Clone, Copy)]
pub struct StoreContext<'a> {
    /// Backend configuration of the store
    pub config: &'a StoreConfig,
    /// Whether the store is namespaced or cluster-scoped
    pub kind: StoreKind,
    /// Namespace of the ExternalSecret being reconciled
    pub namespace: &'a str,
    /// Access to Secrets referenced by the store's auth configuration
    pub cluster: &'a dyn ClusterApi,
}

impl std::fmt::Debug for StoreContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreContext")
            .field("kind", &self.kind)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl StoreContext<'_> {
    /// Namespace a selector resolves in. Namespaced stores can only read
    /// from the ExternalSecret's own namespace.
    pub fn selector_namespace<'s>(&'s self, selector: &'s SecretKeySelector) -> &'s str {
        match (self.kind, selector.namespace.as_deref()) {
            (StoreKind::ClusterSecretStore, Some(namespace)) => namespace,
            _ => self.namespace,
        }
    }

    /// Read one key of a cluster Secret, trimmed of surrounding whitespace.
    ///
    /// # Errors
    ///
    /// [`ProviderError::Setup`] when the Secret or key is missing or the
    /// value is not UTF-8.
    pub async fn secret_key_ref(
        &self,
        ctx: &CallContext,
        selector: &SecretKeySelector,
    ) -> Result<Zeroizing<String>, ProviderError> {
        let namespace = self.selector_namespace(selector);
        let secret = ctx
            .run(async {
                self.cluster
                    .get_secret(namespace, &selector.name)
                    .await
                    .map_err(|e| {
                        ProviderError::setup(format!(
                            "cannot get secret {namespace}/{}: {e}",
                            selector.name
                        ))
                    })
            })
            .await?
            .ok_or_else(|| {
                ProviderError::setup(format!("secret {namespace}/{} not found", selector.name))
            })?;

        let bytes = secret
            .data
            .as_ref()
            .and_then(|data| data.get(&selector.key))
            .ok_or_else(|| {
                ProviderError::setup(format!(
                    "key {} not found in secret {namespace}/{}",
                    selector.key, selector.name
                ))
            })?;

        let value = std::str::from_utf8(&bytes.0).map_err(|e| {
            ProviderError::setup(format!(
                "key {} in secret {namespace}/{} is not valid UTF-8: {e}",
                selector.key, selector.name
            ))
        })?;
        Ok(Zeroizing::new(value.trim().to_string()))
    }
}

/// Convert a JSON object into a byte map. Strings are stored as their
/// UTF-8 bytes, any other value as its compact JSON encoding.
pub fn json_object_to_bytes(object: serde_json::Map<String, serde_json::Value>) -> BTreeMap<String, Vec<u8>> {
    object
        .into_iter()
        .map(|(key, value)| (key, json_value_to_bytes(value)))
        .collect()
}

pub fn json_value_to_bytes(value: serde_json::Value) -> Vec<u8> {
    match value {
        serde_json::Value::String(s) => s.into_bytes(),
        other => other.to_string().into_bytes(),
    }
}

/// Select `reference.property` from a decoded payload, or return the whole
/// payload when no property is requested.
///
/// # Errors
///
/// [`ProviderError::PropertyNotFound`] when the property is absent.
pub fn select_property(
    reference: &RemoteReference,
    mut object: serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<u8>, ProviderError> {
    let Some(property) = reference.property.as_deref() else {
        return Ok(serde_json::Value::Object(object).to_string().into_bytes());
    };
    object
        .remove(property)
        .map(json_value_to_bytes)
        .ok_or_else(|| ProviderError::property_not_found(reference, property))
}

/// Record metrics for a provider operation
///
/// Standardizes metric recording across all providers.
pub fn record_operation<T>(
    provider: &str,
    operation: &str,
    start_time: Instant,
    result: &Result<T, ProviderError>,
) {
    metrics::record_provider_operation(provider, operation, start_time.elapsed().as_secs_f64());
    if let Err(e) = result {
        debug!(provider, operation, error = %e, "provider operation failed");
        metrics::increment_provider_operation_errors(provider);
    }
}
