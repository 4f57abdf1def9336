//! # Reconciler
//!
//! Turns an ExternalSecret into a Kubernetes Secret.
//!
//! One pass:
//! 1. reload the ExternalSecret (gone means deleted, nothing to do)
//! 2. resolve the referenced SecretStore or ClusterSecretStore
//! 3. pick the backend factory from the registry and authenticate
//! 4. fetch `dataFrom` maps, then `data` values, merged in order
//! 5. build the Secret, overlay the template, and server-side apply it
//! 6. record the outcome in the `Ready` condition
//!
//! Failures abort before anything is applied and requeue after a fixed delay.

mod cluster;
mod merge;
mod reconcile;
mod secret;
mod status;
mod template;
mod types;

#[cfg(test)]
pub use cluster::MockClusterApi;
pub use cluster::{ClusterApi, KubeClusterApi};
pub use merge::{fetch_data, merge_into};
pub use reconcile::{reconcile, sync};
pub use secret::build_secret;
pub use status::next_status;
pub use template::apply_template;
pub use types::{Reconciler, ReconcilerError, SyncError};
