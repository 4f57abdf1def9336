//! # Generated Secret
//!
//! The Secret shares the ExternalSecret's name and namespace, is controlled
//! by it through an owner reference, and inherits its labels and annotations.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use tracing::warn;

use crate::constants::DEFAULT_SECRET_TYPE;
use crate::crd::ExternalSecret;

use super::{apply_template, SyncError};

/// Build the desired Secret from fetched values and the template overlay.
///
/// # Errors
///
/// [`SyncError::TemplateInvalid`] when the overlay cannot be applied.
pub fn build_secret(
    external_secret: &ExternalSecret,
    data: BTreeMap<String, Vec<u8>>,
) -> Result<Secret, SyncError> {
    let name = external_secret.name_any();
    let namespace = external_secret.namespace();
    let owner_references = external_secret
        .controller_owner_ref(&())
        .map(|owner| vec![owner]);
    if owner_references.is_none() {
        warn!(external_secret = %name, "ExternalSecret has no uid, Secret will have no owner");
    }

    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: namespace.clone(),
            labels: external_secret.metadata.labels.clone(),
            annotations: external_secret.metadata.annotations.clone(),
            owner_references: owner_references.clone(),
            ..ObjectMeta::default()
        },
        data: Some(
            data.into_iter()
                .map(|(key, value)| (key, ByteString(value)))
                .collect(),
        ),
        type_: Some(DEFAULT_SECRET_TYPE.to_string()),
        ..Secret::default()
    };

    let mut secret = apply_template(secret, external_secret.spec.template.as_ref())?;

    // identity is not templatable
    secret.metadata.name = Some(name);
    secret.metadata.namespace = namespace;
    secret.metadata.owner_references = owner_references;
    if matches!(secret.type_.as_deref(), None | Some("")) {
        secret.type_ = Some(DEFAULT_SECRET_TYPE.to_string());
    }
    Ok(secret)
}
