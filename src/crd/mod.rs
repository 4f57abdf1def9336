//! # Custom Resource Definitions
//!
//! CRD types for the External Secrets Controller.
//!
//! ## Module Structure
//!
//! - `external_secret.rs` - `ExternalSecret`, the desired-state resource
//! - `store.rs` - `SecretStore` / `ClusterSecretStore` and the backend discriminator
//! - `vault.rs`, `aws.rs`, `gcp.rs` - per-backend store configuration
//! - `selector.rs` - references to keys in cluster Secrets
//! - `status.rs` - status and condition types

mod aws;
mod external_secret;
mod gcp;
mod selector;
mod status;
mod store;
mod vault;

pub use aws::{AwsAuth, AwsStore};
pub use external_secret::{
    ExternalSecret, ExternalSecretData, ExternalSecretSpec, RemoteReference, StoreKind, StoreRef,
};
pub use gcp::{GcpAuth, GcpStore};
pub use selector::SecretKeySelector;
pub use status::{Condition, ConditionStatus, ExternalSecretStatus, READY_CONDITION};
pub use store::{
    ClusterSecretStore, ClusterSecretStoreSpec, SecretStore, SecretStoreSpec, StoreBackend,
    StoreConfig, StoreProvider,
};
pub use vault::{VaultAppRole, VaultAuth, VaultKubernetesAuth, VaultKvVersion, VaultStore};
