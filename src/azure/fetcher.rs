use std::sync::Arc;

use crate::azure::TokenExchange;
use crate::credentials::{BearerToken, CredentialEntry, RegistryIdentity};
use crate::errors::FetchError;
use crate::orchestrator::RegistryTokenFetcher;
use crate::parser::payload::decode_expiry;

/// Exchange + entry building for one cycle; carries that cycle's bearer token.
pub struct AcrRegistryFetcher<X> {
    exchange: Arc<X>,
    bearer: BearerToken,
}

impl<X> AcrRegistryFetcher<X> {
    pub fn new(exchange: Arc<X>, bearer: BearerToken) -> Self {
        Self { exchange, bearer }
    }
}

impl<X> RegistryTokenFetcher for AcrRegistryFetcher<X>
where
    X: TokenExchange + 'static,
{
    async fn fetch(&self, identity: &RegistryIdentity) -> Result<CredentialEntry, FetchError> {
        let refresh_token = self.exchange.exchange(identity, &self.bearer).await?;
        Ok(CredentialEntry::build(
            identity.login_server.as_str(),
            refresh_token,
            decode_expiry,
        ))
    }
}
