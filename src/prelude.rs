//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use external_secrets_controller::prelude::*;
//! ```

// CRD types - most commonly used
pub use crate::crd::*;

// Backend contract and registry
pub use crate::provider::{
    BackendRegistry, CallContext, ClientFactory, ProviderError, SecretStoreClient, StoreContext,
    StoreError,
};

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::{
    reconcile, ClusterApi, KubeClusterApi, Reconciler, ReconcilerError, SyncError,
};

// Config types
pub use crate::config::{ControllerConfig, ProviderEndpoints};

// Backends
pub use crate::provider::aws::{AwsFactory, AwsSecretsManager};
pub use crate::provider::gcp::{GcpFactory, GcpSecretManager};
pub use crate::provider::vault::{VaultClient, VaultCredentials, VaultFactory};
