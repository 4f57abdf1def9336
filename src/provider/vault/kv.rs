//! KV secrets engine paths and payload unwrapping

use crate::crd::VaultKvVersion;

/// API path of a secret, relative to the server address.
///
/// v2 reads go through the engine's `data/` prefix. A mount that already
/// ends in `/data` is not suffixed again.
pub fn read_path(version: VaultKvVersion, mount: &str, path: &str) -> String {
    let mount = mount.trim_matches('/');
    let path = path.trim_start_matches('/');
    match version {
        VaultKvVersion::V1 => format!("/v1/{mount}/{path}"),
        VaultKvVersion::V2 if mount.ends_with("/data") => {
            format!("/v1/{mount}/{path}")
        }
        VaultKvVersion::V2 => format!("/v1/{mount}/data/{path}"),
    }
}

/// Extract the key/value map from a read response.
///
/// v1 responses carry the map in `data`; v2 nests it in `data.data` next to
/// the version metadata.
pub fn unwrap_data(
    version: VaultKvVersion,
    mut body: serde_json::Value,
) -> Result<serde_json::Map<String, serde_json::Value>, String> {
    let data = match version {
        VaultKvVersion::V1 => body.get_mut("data").map(serde_json::Value::take),
        VaultKvVersion::V2 => body
            .get_mut("data")
            .and_then(|data| data.get_mut("data"))
            .map(serde_json::Value::take),
    };
    match data {
        Some(serde_json::Value::Object(map)) => Ok(map),
        Some(serde_json::Value::Null) | None => Err("response contains no data".to_string()),
        Some(_) => Err("unexpected secret type".to_string()),
    }
}
