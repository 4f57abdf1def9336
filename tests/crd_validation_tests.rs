//! # CRD Validation Tests
//!
//! Sample resources in the documented YAML shape, to catch schema drift
//! early.

use external_secrets_controller::crd::{
    ClusterSecretStore, ExternalSecret, SecretStore, StoreBackend, StoreKind, StoreProvider,
    VaultKvVersion,
};
use kube::core::CustomResourceExt;

#[test]
fn test_external_secret_with_template() {
    let yaml = r#"
apiVersion: secret-management.microscaler.io/v1alpha1
kind: ExternalSecret
metadata:
  name: database-credentials
  namespace: billing
spec:
  storeRef:
    name: shared-vault
    kind: ClusterSecretStore
  dataFrom:
    - name: apps/shared/database
  data:
    - secretKey: password
      remoteRef:
        name: apps/billing/database
        property: password
        version: "3"
  template:
    type: kubernetes.io/basic-auth
    metadata:
      annotations:
        reloader.stakater.com/match: "true"
"#;

    let es: ExternalSecret =
        serde_yaml::from_str(yaml).expect("Should deserialize ExternalSecret with template");

    assert_eq!(es.spec.store_ref.kind, StoreKind::ClusterSecretStore);
    assert_eq!(es.spec.data_from.len(), 1);
    assert_eq!(es.spec.data[0].secret_key, "password");
    assert_eq!(es.spec.data[0].remote_ref.version.as_deref(), Some("3"));
    let template = es.spec.template.expect("template should be kept");
    assert_eq!(template["type"], "kubernetes.io/basic-auth");
}

#[test]
fn test_vault_approle_store() {
    let yaml = r#"
apiVersion: secret-management.microscaler.io/v1alpha1
kind: SecretStore
metadata:
  name: vault-backend
  namespace: billing
spec:
  provider:
    vault:
      server: https://vault.example.com:8200
      path: secret
      namespace: team-a
      auth:
        appRole:
          roleId: 4f1e0c2a-billing
          secretRef:
            name: vault-approle
            key: secret-id
"#;

    let store: SecretStore = serde_yaml::from_str(yaml).expect("Should deserialize Vault store");

    let Ok(StoreProvider::Vault(vault)) = store.spec.provider.provider() else {
        panic!("expected a vault provider");
    };
    assert_eq!(vault.version, VaultKvVersion::V2);
    let app_role = vault.auth.app_role.as_ref().unwrap();
    assert_eq!(app_role.path, "approle");
    assert_eq!(app_role.secret_ref.key, "secret-id");
}

#[test]
fn test_aws_cluster_store_with_role() {
    let yaml = r#"
apiVersion: secret-management.microscaler.io/v1alpha1
kind: ClusterSecretStore
metadata:
  name: aws-prod
spec:
  provider:
    aws:
      region: eu-west-1
      role: arn:aws:iam::123456789012:role/external-secrets
      auth:
        accessKeyIdSecretRef:
          name: aws-credentials
          namespace: platform
          key: access-key-id
        secretAccessKeySecretRef:
          name: aws-credentials
          namespace: platform
          key: secret-access-key
"#;

    let store: ClusterSecretStore =
        serde_yaml::from_str(yaml).expect("Should deserialize AWS cluster store");

    assert_eq!(store.spec.provider.backend().unwrap(), StoreBackend::Aws);
    let aws = store.spec.provider.aws.as_ref().unwrap();
    assert_eq!(aws.region.as_deref(), Some("eu-west-1"));
    let auth = aws.auth.as_ref().unwrap();
    assert_eq!(
        auth.access_key_id_secret_ref
            .as_ref()
            .and_then(|selector| selector.namespace.as_deref()),
        Some("platform")
    );
}

#[test]
fn test_gcp_store_with_project() {
    let yaml = r#"
apiVersion: secret-management.microscaler.io/v1alpha1
kind: SecretStore
metadata:
  name: gcp-backend
  namespace: billing
spec:
  provider:
    gcp:
      projectID: acme-prod
      auth:
        secretRef:
          name: gcp-sa
          key: key.json
"#;

    let store: SecretStore = serde_yaml::from_str(yaml).expect("Should deserialize GCP store");

    let gcp = store.spec.provider.gcp.as_ref().unwrap();
    assert_eq!(gcp.project_id.as_deref(), Some("acme-prod"));
    assert!(gcp.auth.as_ref().unwrap().secret_ref.is_some());
}

#[test]
fn test_store_with_two_backends_is_ambiguous() {
    let yaml = r#"
apiVersion: secret-management.microscaler.io/v1alpha1
kind: SecretStore
metadata:
  name: confused
  namespace: billing
spec:
  provider:
    aws:
      region: eu-west-1
    gcp:
      projectID: acme-prod
"#;

    let store: SecretStore = serde_yaml::from_str(yaml).unwrap();
    let err = store.spec.provider.backend().unwrap_err();
    assert_eq!(
        err.to_string(),
        "store configures more than one backend: aws, gcp"
    );
}

#[test]
fn test_generated_crds() {
    let external_secret = ExternalSecret::crd();
    assert_eq!(
        external_secret.metadata.name.as_deref(),
        Some("externalsecrets.secret-management.microscaler.io")
    );
    assert_eq!(external_secret.spec.scope, "Namespaced");
    assert_eq!(
        external_secret.spec.names.short_names,
        Some(vec!["es".to_string()])
    );
    assert!(external_secret.spec.versions[0]
        .subresources
        .as_ref()
        .and_then(|s| s.status.as_ref())
        .is_some());

    assert_eq!(SecretStore::crd().spec.scope, "Namespaced");
    assert_eq!(ClusterSecretStore::crd().spec.scope, "Cluster");
}
