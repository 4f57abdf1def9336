//! Secret version resource names

use crate::constants::DEFAULT_GCP_SECRET_VERSION;
use crate::crd::RemoteReference;
use crate::provider::ProviderError;

/// Expand a reference into `projects/{p}/secrets/{s}/versions/{v}`.
///
/// - a full version name is used as-is
/// - `projects/{p}/secrets/{s}` gets the version appended
/// - a bare secret id needs a project
pub fn version_name(
    reference: &RemoteReference,
    project_id: Option<&str>,
) -> Result<String, ProviderError> {
    let name = reference.name.trim().trim_matches('/');
    let version = reference
        .version
        .as_deref()
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_GCP_SECRET_VERSION);

    if name.is_empty() {
        return Err(ProviderError::read(reference, "secret name is empty"));
    }
    if name.starts_with("projects/") {
        if name.contains("/versions/") {
            return Ok(name.to_string());
        }
        return Ok(format!("{name}/versions/{version}"));
    }

    let project_id = project_id.filter(|p| !p.is_empty()).ok_or_else(|| {
        ProviderError::read(
            reference,
            "no projectID configured to expand a bare secret name",
        )
    })?;
    Ok(format!(
        "projects/{project_id}/secrets/{name}/versions/{version}"
    ))
}
