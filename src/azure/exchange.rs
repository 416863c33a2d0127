use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::azure::TokenExchange;
use crate::credentials::{BearerToken, RegistryIdentity};
use crate::errors::FetchError;

pub const EXCHANGE_PATH: &str = "/oauth2/exchange";

#[derive(Debug, Deserialize)]
struct ExchangeResponse {
    #[serde(default)]
    refresh_token: Option<String>,
}

/// ACR token exchange: trades an AAD access token for a registry refresh token.
#[derive(Clone)]
pub struct AcrTokenExchange {
    client: Client,
    scheme: String,
}

impl AcrTokenExchange {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            scheme: "https".to_owned(),
        }
    }

    /// Plain http is only useful against local test registries.
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_owned();
        self
    }

    pub fn exchange_url(&self, login_server: &str) -> String {
        format!("{}://{}{}", self.scheme, login_server, EXCHANGE_PATH)
    }
}

impl TokenExchange for AcrTokenExchange {
    async fn exchange(
        &self,
        identity: &RegistryIdentity,
        bearer: &BearerToken,
    ) -> Result<String, FetchError> {
        let server = identity.login_server.as_str();
        let form = [
            ("grant_type", "access_token"),
            ("service", server),
            ("tenant", identity.tenant_id.as_str()),
            ("access_token", bearer.access_token.as_str()),
        ];

        debug!(server = %server, "requesting registry refresh token");
        let transport = |source: reqwest::Error| FetchError::Transport {
            server: server.to_owned(),
            source,
        };

        let response = self
            .client
            .post(self.exchange_url(server))
            .form(&form)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                server: server.to_owned(),
                status,
            });
        }

        let body = response.bytes().await.map_err(transport)?;
        let body: ExchangeResponse =
            serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
                server: server.to_owned(),
                reason: e.to_string(),
            })?;
        body.refresh_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| FetchError::MissingRefreshToken {
                server: server.to_owned(),
            })
    }
}
