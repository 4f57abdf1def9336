//! External Secrets Controller Library
//!
//! Syncs values from external secret stores into Kubernetes Secrets.
//! Tests are included in the module files.
//!
//! ## Quick Start
//!
//! ```rust
//! use external_secrets_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
pub mod server;
