//! # CRD Generator
//!
//! Generates the CustomResourceDefinition YAML for `ExternalSecret`,
//! `SecretStore` and `ClusterSecretStore` from the Rust type definitions.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/external-secrets.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use anyhow::Result;
use external_secrets_controller::crd::{ClusterSecretStore, ExternalSecret, SecretStore};
use kube::core::CustomResourceExt;

fn main() -> Result<()> {
    let crds = [
        ExternalSecret::crd(),
        SecretStore::crd(),
        ClusterSecretStore::crd(),
    ];

    let documents = crds
        .iter()
        .map(serde_yaml::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    print!("{}", documents.join("---\n"));
    Ok(())
}
