//! # Controller
//!
//! ExternalSecret reconciliation: store resolution, fetching, merging,
//! templating, and the upsert of the generated Secret.

pub mod reconciler;
