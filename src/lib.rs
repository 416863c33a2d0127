//! # ACR auto-login
//!
//! Refreshes Azure Container Registry credentials for every registry of the configured
//! subscriptions and publishes them as a docker `config.json` document, optionally
//! mirrored into a Kubernetes secret.
//!
//! Modules:
//! - `config`: command line / environment configuration
//! - `azure`: Azure AD, Resource Manager and ACR collaborators
//! - `credentials`: credential entries, sets and the docker config document
//! - `orchestrator`: refresh cycle fan-out, expiry scheduling and the daemon loop
//! - `sinks`: file and Kubernetes secret publication
//! - `parser`: registry token payload decoding

pub mod azure;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod helpers;
pub mod observability;
pub mod orchestrator;
pub mod parser;
pub mod resilience;
pub mod server;
pub mod sinks;
#[cfg(test)]
mod tests;
pub mod utils;

pub use crate::config::settings::ServiceConfig;
pub use crate::orchestrator::cycle::run_cycle;
