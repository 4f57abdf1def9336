//! # Configuration
//!
//! Controller settings parsed from command-line flags with environment
//! variable fallbacks, plus endpoint overrides for the cloud backends.

mod controller;

pub use controller::{Args, ControllerConfig, LogFormat, ProviderEndpoints};
