//! # Types
//!
//! Core types for the reconciler.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::ControllerConfig;
use crate::crd::StoreKind;
use crate::provider::{BackendRegistry, ProviderError, StoreError};

use super::ClusterApi;

/// Why one sync pass failed. The variant picks the `Ready` condition reason,
/// the message names the failing stage.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cannot get ExternalSecret {namespace}/{name}: {source}")]
    LoadFailed {
        namespace: String,
        name: String,
        source: kube::Error,
    },
    #[error("cannot get store reference: {kind} {name}: {message}")]
    StoreNotFound {
        kind: StoreKind,
        name: String,
        message: String,
    },
    #[error("cannot setup store client: {0}")]
    InvalidStore(#[from] StoreError),
    #[error("cannot setup store client: {0}")]
    StoreSetupFailed(ProviderError),
    #[error("cannot get ExternalSecret data from store: {0}")]
    BackendReadFailed(ProviderError),
    #[error("cannot get ExternalSecret data from store: {0}")]
    PropertyNotFound(ProviderError),
    #[error("failed to merge secret with template field: {0}")]
    TemplateInvalid(String),
    #[error("cannot create or update secret: {0}")]
    SecretUpsertFailed(kube::Error),
    #[error("reconcile cancelled")]
    Cancelled,
}

impl SyncError {
    /// Client construction failure; cancellation keeps its own outcome
    pub fn setup(error: ProviderError) -> Self {
        match error {
            ProviderError::Cancelled => Self::Cancelled,
            other => Self::StoreSetupFailed(other),
        }
    }

    /// Fetch failure for `reference`
    pub fn read(reference: &crate::crd::RemoteReference, error: ProviderError) -> Self {
        match error {
            ProviderError::Cancelled => Self::Cancelled,
            ProviderError::PropertyNotFound { .. } => Self::PropertyNotFound(error),
            ProviderError::Read { .. } => Self::BackendReadFailed(error),
            other => Self::BackendReadFailed(ProviderError::read(reference, other)),
        }
    }

    /// Condition reason and metric label
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::LoadFailed { .. } => "LoadFailed",
            Self::StoreNotFound { .. } => "StoreNotFound",
            Self::InvalidStore(StoreError::Unconfigured) => "BackendUnconfigured",
            Self::InvalidStore(StoreError::Ambiguous(_)) => "BackendAmbiguous",
            Self::InvalidStore(StoreError::Unregistered(_)) => "BackendUnregistered",
            Self::InvalidStore(StoreError::AlreadyRegistered(_)) | Self::StoreSetupFailed(_) => {
                "StoreSetupFailed"
            }
            Self::BackendReadFailed(_) => "BackendReadFailed",
            Self::PropertyNotFound(_) => "PropertyNotFound",
            Self::TemplateInvalid(_) => "TemplateInvalid",
            Self::SecretUpsertFailed(_) => "SecretUpsertFailed",
            Self::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Reconciliation failed: {0}")]
    ReconciliationFailed(#[from] SyncError),
}

impl ReconcilerError {
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ReconciliationFailed(e) => e.reason(),
        }
    }
}

/// Shared context handed to every reconcile
pub struct Reconciler {
    pub cluster: Arc<dyn ClusterApi>,
    pub registry: Arc<BackendRegistry>,
    pub config: ControllerConfig,
    /// Root token, cancelled on shutdown. Each reconcile runs on a child.
    pub shutdown: CancellationToken,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        registry: Arc<BackendRegistry>,
        config: ControllerConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            cluster,
            registry,
            config,
            shutdown,
        }
    }
}
