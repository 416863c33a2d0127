//! Error taxonomy.
//!
//! Fatal errors (`ConfigError`, `CycleError`) may stop the process or a cycle.
//! Everything else is recoverable and never leaves the orchestrator or the sink manager.

use thiserror::Error;

/// Invalid or incomplete startup configuration. Reported once, before any cycle.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("unable to parse duration '{value}': {reason}")]
    Duration { value: String, reason: String },
}

/// Aborts the current cycle: without a bearer token or a registry list nothing can be refreshed.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("failed to obtain bearer token for tenant '{tenant}': {reason}")]
    Authentication { tenant: String, reason: String },

    #[error("failed to list registries for subscription '{subscription}': {reason}")]
    Enumeration { subscription: String, reason: String },

    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// A single registry could not be refreshed. The registry is left out of the credential set.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("token exchange request to '{server}' failed: {source}")]
    Transport {
        server: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("token exchange for '{server}' returned status {status}")]
    Status { server: String, status: http::StatusCode },

    #[error("token exchange for '{server}' returned an unreadable body: {reason}")]
    Decode { server: String, reason: String },

    #[error("token exchange for '{server}' returned no refresh token")]
    MissingRefreshToken { server: String },

    #[error("fetch task for '{server}' aborted: {reason}")]
    Aborted { server: String, reason: String },
}

impl FetchError {
    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "transport",
            FetchError::Status { .. } => "status",
            FetchError::Decode { .. } => "decode",
            FetchError::MissingRefreshToken { .. } => "missing_refresh_token",
            FetchError::Aborted { .. } => "aborted",
        }
    }
}

/// The opaque token payload could not be decoded.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("invalid token segment count: {0}")]
    SegmentCount(usize),

    #[error("error decoding payload segment: {0}")]
    Base64(String),

    #[error("error unmarshalling token payload: {0}")]
    Json(String),
}

/// Publishing to one sink failed. Other sinks are unaffected.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("io error writing '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
