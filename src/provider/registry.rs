//! # Backend Registry
//!
//! Maps a store's backend discriminator to the factory that builds its
//! clients. Populated once at startup, read on every reconcile.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::config::ProviderEndpoints;
use crate::crd::{StoreBackend, StoreConfig};
use crate::provider::ClientFactory;
use crate::provider::{aws::AwsFactory, gcp::GcpFactory, vault::VaultFactory};

/// Store configuration errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store does not configure a backend")]
    Unconfigured,
    #[error("store configures more than one backend: {}", join(.0))]
    Ambiguous(Vec<StoreBackend>),
    #[error("no backend registered for {0}")]
    Unregistered(StoreBackend),
    #[error("backend {0} is already registered")]
    AlreadyRegistered(StoreBackend),
}

fn join(backends: &[StoreBackend]) -> String {
    backends
        .iter()
        .map(|b| b.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Write-once, read-many map of backend factories
#[derive(Default)]
pub struct BackendRegistry {
    factories: RwLock<HashMap<StoreBackend, Arc<dyn ClientFactory>>>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        let mut backends: Vec<_> = factories.keys().copied().collect();
        backends.sort();
        f.debug_struct("BackendRegistry")
            .field("backends", &backends)
            .finish()
    }
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the Vault, AWS and GCP backends
    ///
    /// # Errors
    ///
    /// Never in practice: each backend is registered once.
    pub fn with_default_backends(endpoints: &ProviderEndpoints) -> Result<Self, StoreError> {
        let registry = Self::new();
        registry.register(StoreBackend::Vault, Arc::new(VaultFactory))?;
        registry.register(StoreBackend::Aws, Arc::new(AwsFactory::new(endpoints.clone())))?;
        registry.register(StoreBackend::Gcp, Arc::new(GcpFactory::new(endpoints.clone())))?;
        Ok(registry)
    }

    /// Register a factory for a backend.
    ///
    /// # Errors
    ///
    /// [`StoreError::AlreadyRegistered`] if the backend already has a factory.
    pub fn register(
        &self,
        backend: StoreBackend,
        factory: Arc<dyn ClientFactory>,
    ) -> Result<(), StoreError> {
        let mut factories = self.factories.write().unwrap_or_else(PoisonError::into_inner);
        if factories.contains_key(&backend) {
            return Err(StoreError::AlreadyRegistered(backend));
        }
        factories.insert(backend, factory);
        Ok(())
    }

    /// Look up the factory for the single backend a store configures.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unconfigured`] or [`StoreError::Ambiguous`] when the store
    /// does not populate exactly one backend, [`StoreError::Unregistered`]
    /// when nothing is registered for it.
    pub fn resolve(&self, config: &StoreConfig) -> Result<Arc<dyn ClientFactory>, StoreError> {
        let backend = config.backend()?;
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        factories
            .get(&backend)
            .map(Arc::clone)
            .ok_or(StoreError::Unregistered(backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{AwsStore, GcpStore};
    use crate::provider::{CallContext, ProviderError, SecretStoreClient, StoreContext};
    use async_trait::async_trait;

    struct NoopFactory;

    #[async_trait]
    impl ClientFactory for NoopFactory {
        async fn new_client(
            &self,
            _ctx: &CallContext,
            _store: &StoreContext<'_>,
        ) -> Result<Box<dyn SecretStoreClient>, ProviderError> {
            Err(ProviderError::setup("noop"))
        }
    }

    fn aws_store() -> StoreConfig {
        StoreConfig {
            aws: Some(AwsStore::default()),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn test_register_then_resolve_returns_same_factory() {
        let registry = BackendRegistry::new();
        let factory: Arc<dyn ClientFactory> = Arc::new(NoopFactory);
        registry
            .register(StoreBackend::Aws, Arc::clone(&factory))
            .unwrap();

        let resolved = registry.resolve(&aws_store()).unwrap();
        assert!(Arc::ptr_eq(&resolved, &factory));
    }

    #[test]
    fn test_unregistered_backend() {
        let registry = BackendRegistry::new();
        registry
            .register(StoreBackend::Aws, Arc::new(NoopFactory))
            .unwrap();

        let gcp = StoreConfig {
            gcp: Some(GcpStore::default()),
            ..StoreConfig::default()
        };
        assert!(matches!(
            registry.resolve(&gcp),
            Err(StoreError::Unregistered(StoreBackend::Gcp))
        ));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let registry = BackendRegistry::new();
        registry
            .register(StoreBackend::Vault, Arc::new(NoopFactory))
            .unwrap();
        assert!(matches!(
            registry.register(StoreBackend::Vault, Arc::new(NoopFactory)),
            Err(StoreError::AlreadyRegistered(StoreBackend::Vault))
        ));
    }

    #[test]
    fn test_unconfigured_and_ambiguous_stores() {
        let registry = BackendRegistry::with_default_backends(&ProviderEndpoints::default()).unwrap();

        assert!(matches!(
            registry.resolve(&StoreConfig::default()),
            Err(StoreError::Unconfigured)
        ));

        let both = StoreConfig {
            aws: Some(AwsStore::default()),
            gcp: Some(GcpStore::default()),
            ..StoreConfig::default()
        };
        let err = registry.resolve(&both).err().unwrap();
        assert_eq!(
            err.to_string(),
            "store configures more than one backend: aws, gcp"
        );
    }

    #[test]
    fn test_default_backends_are_registered() {
        let registry = BackendRegistry::with_default_backends(&ProviderEndpoints::default()).unwrap();
        assert_eq!(
            format!("{registry:?}"),
            "BackendRegistry { backends: [Vault, Aws, Gcp] }"
        );
    }
}
