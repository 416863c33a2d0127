/// Azure collaborators
///
/// Capability traits the refresh cycle consumes, with the Azure AD, Resource Manager and
/// ACR implementations behind them.
use std::future::Future;
use std::time::Duration;

use reqwest::Client;

use crate::credentials::{BearerToken, RegistryIdentity};
use crate::errors::{CycleError, FetchError};

pub mod exchange;
pub mod fetcher;
pub mod identity;
pub mod registries;

pub trait BearerTokenProvider: Send + Sync {
    fn bearer_token(&self) -> impl Future<Output = Result<BearerToken, CycleError>> + Send;
}

pub trait RegistryEnumerator: Send + Sync {
    /// Errors are fatal for the whole cycle.
    fn list_registries(
        &self,
        subscription_id: &str,
        bearer: &BearerToken,
    ) -> impl Future<Output = Result<Vec<RegistryIdentity>, CycleError>> + Send;
}

pub trait TokenExchange: Send + Sync {
    /// Exchange the bearer token for a registry-scoped refresh token.
    fn exchange(
        &self,
        identity: &RegistryIdentity,
        bearer: &BearerToken,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Shared HTTP client; the timeout bounds every collaborator call.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}
