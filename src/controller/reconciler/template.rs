//! # Template Overlay
//!
//! Deep-merges `spec.template` over the generated Secret. Objects merge key
//! by key, anything else in the template replaces the generated value.

use k8s_openapi::api::core::v1::Secret;
use serde_json::{Map, Value};

use super::SyncError;

/// Overlay `template` onto `secret`. A string template is parsed as JSON.
///
/// # Errors
///
/// [`SyncError::TemplateInvalid`] when the template is not a JSON object or
/// the merged document is not a valid Secret.
pub fn apply_template(secret: Secret, template: Option<&Value>) -> Result<Secret, SyncError> {
    let overlay = match template {
        None | Some(Value::Null) => return Ok(secret),
        Some(Value::String(raw)) => serde_json::from_str::<Value>(raw)
            .map_err(|e| SyncError::TemplateInvalid(format!("invalid JSON: {e}")))?,
        Some(value) => value.clone(),
    };
    let Value::Object(overlay) = overlay else {
        return Err(SyncError::TemplateInvalid(
            "template must be an object".to_string(),
        ));
    };

    let mut base = serde_json::to_value(&secret)
        .map_err(|e| SyncError::TemplateInvalid(e.to_string()))?;
    match &mut base {
        Value::Object(base) => deep_merge(base, overlay),
        _ => return Err(SyncError::TemplateInvalid("secret is not an object".to_string())),
    }

    serde_json::from_value(base).map_err(|e| SyncError::TemplateInvalid(e.to_string()))
}

fn deep_merge(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::ByteString;
    use kube::api::ObjectMeta;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn secret() -> Secret {
        Secret {
            metadata: ObjectMeta {
                name: Some("db".to_string()),
                namespace: Some("default".to_string()),
                labels: Some(BTreeMap::from([("app".to_string(), "billing".to_string())])),
                ..ObjectMeta::default()
            },
            data: Some(BTreeMap::from([(
                "password".to_string(),
                ByteString(b"hunter2".to_vec()),
            )])),
            type_: Some("Opaque".to_string()),
            ..Secret::default()
        }
    }

    #[test]
    fn test_annotation_added_and_labels_kept() {
        let template = json!({"metadata": {"annotations": {"k": "v"}}});
        let merged = apply_template(secret(), Some(&template)).unwrap();

        let annotations = merged.metadata.annotations.unwrap();
        assert_eq!(annotations.get("k").map(String::as_str), Some("v"));
        let labels = merged.metadata.labels.unwrap();
        assert_eq!(labels.get("app").map(String::as_str), Some("billing"));
        assert_eq!(merged.data, secret().data);
    }

    #[test]
    fn test_template_fields_win() {
        let template = json!({
            "type": "kubernetes.io/basic-auth",
            "metadata": {"labels": {"app": "payments"}}
        });
        let merged = apply_template(secret(), Some(&template)).unwrap();

        assert_eq!(merged.type_.as_deref(), Some("kubernetes.io/basic-auth"));
        let labels = merged.metadata.labels.unwrap();
        assert_eq!(labels.get("app").map(String::as_str), Some("payments"));
    }

    #[test]
    fn test_string_template_is_parsed() {
        let template = Value::String(r#"{"metadata":{"annotations":{"k":"v"}}}"#.to_string());
        let merged = apply_template(secret(), Some(&template)).unwrap();
        assert!(merged.metadata.annotations.unwrap().contains_key("k"));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let template = Value::String("{not json".to_string());
        let err = apply_template(secret(), Some(&template)).unwrap_err();
        assert_eq!(err.reason(), "TemplateInvalid");
        assert!(err
            .to_string()
            .starts_with("failed to merge secret with template field"));
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let template = json!({"metadata": {"labels": ["not", "a", "map"]}});
        let err = apply_template(secret(), Some(&template)).unwrap_err();
        assert!(matches!(err, SyncError::TemplateInvalid(_)));

        let err = apply_template(secret(), Some(&json!(["a"]))).unwrap_err();
        assert!(matches!(err, SyncError::TemplateInvalid(_)));
    }

    #[test]
    fn test_no_template_is_identity() {
        let merged = apply_template(secret(), None).unwrap();
        assert_eq!(merged, secret());
    }
}
