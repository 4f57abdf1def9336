//! # Provider Modules
//!
//! Backends that read secret material from external stores.
//!
//! Each backend implements:
//! - `ClientFactory` to authenticate against a store and build a client
//! - `SecretStoreClient` to fetch one value or a whole map
//!
//! Factories are registered in a [`BackendRegistry`] keyed by
//! [`StoreBackend`](crate::crd::StoreBackend). Clients are built fresh for
//! every reconcile and dropped afterwards.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::crd::RemoteReference;

/// Errors raised by backends
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Authentication or credential resolution failed
    #[error("{0}")]
    Setup(String),
    /// The remote store rejected or failed a read
    #[error("cannot read {reference}: {message}")]
    Read { reference: String, message: String },
    /// The payload has no such field
    #[error("property {property} not found in {reference}")]
    PropertyNotFound { reference: String, property: String },
    /// The reconcile was cancelled while a call was in flight
    #[error("operation cancelled")]
    Cancelled,
    /// A single remote call exceeded its deadline
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup(message.into())
    }

    pub fn read(reference: &RemoteReference, message: impl std::fmt::Display) -> Self {
        Self::Read {
            reference: reference.to_string(),
            message: message.to_string(),
        }
    }

    pub fn property_not_found(reference: &RemoteReference, property: &str) -> Self {
        Self::PropertyNotFound {
            reference: reference.name.clone(),
            property: property.to_string(),
        }
    }
}

/// Client for one authenticated store
#[async_trait]
pub trait SecretStoreClient: Send + Sync {
    /// Fetch a single value. When `reference.property` is set, only that
    /// field of a structured payload is returned.
    async fn get_secret(
        &self,
        ctx: &CallContext,
        reference: &RemoteReference,
    ) -> Result<Vec<u8>, ProviderError>;

    /// Fetch a structured payload as a map of keys to values
    async fn get_secret_map(
        &self,
        ctx: &CallContext,
        reference: &RemoteReference,
    ) -> Result<BTreeMap<String, Vec<u8>>, ProviderError>;
}

/// Builds authenticated clients for one backend kind
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Resolve credentials and authenticate. Fails fast with
    /// [`ProviderError::Setup`] when the store cannot be used.
    async fn new_client(
        &self,
        ctx: &CallContext,
        store: &StoreContext<'_>,
    ) -> Result<Box<dyn SecretStoreClient>, ProviderError>;
}

// Common utilities shared across providers
pub mod common;
pub mod registry;

// Provider implementations
pub mod aws;
pub mod gcp;
pub mod vault;

pub use common::{CallContext, StoreContext};
pub use registry::{BackendRegistry, StoreError};
