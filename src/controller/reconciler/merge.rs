//! # Data Merge
//!
//! Collects the values of one ExternalSecret. `dataFrom` maps are merged
//! left to right, then each `data` entry is written on top. A later key
//! replaces an earlier one.

use std::collections::BTreeMap;

use tracing::debug;

use crate::crd::ExternalSecretSpec;
use crate::provider::{CallContext, SecretStoreClient};

use super::SyncError;

/// Overlay `source` onto `target`; keys in `source` win
pub fn merge_into(target: &mut BTreeMap<String, Vec<u8>>, source: BTreeMap<String, Vec<u8>>) {
    target.extend(source);
}

/// Fetch every referenced value. The first failure aborts the whole fetch.
///
/// # Errors
///
/// [`SyncError::BackendReadFailed`] or [`SyncError::PropertyNotFound`]
/// naming the failing reference, or [`SyncError::Cancelled`].
pub async fn fetch_data(
    ctx: &CallContext,
    client: &dyn SecretStoreClient,
    spec: &ExternalSecretSpec,
) -> Result<BTreeMap<String, Vec<u8>>, SyncError> {
    let mut data = BTreeMap::new();

    for reference in &spec.data_from {
        let values = client
            .get_secret_map(ctx, reference)
            .await
            .map_err(|e| SyncError::read(reference, e))?;
        debug!(reference = %reference, keys = values.len(), "Fetched dataFrom entry");
        merge_into(&mut data, values);
    }

    for entry in &spec.data {
        let value = client
            .get_secret(ctx, &entry.remote_ref)
            .await
            .map_err(|e| SyncError::read(&entry.remote_ref, e))?;
        debug!(reference = %entry.remote_ref, secret_key = %entry.secret_key, "Fetched data entry");
        data.insert(entry.secret_key.clone(), value);
    }

    Ok(data)
}
