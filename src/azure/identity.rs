use reqwest::Client;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::azure::BearerTokenProvider;
use crate::config::settings::IdentityConfig;
use crate::credentials::BearerToken;
use crate::errors::CycleError;
use crate::helpers::time::{from_unix, now, now_i64};

/// Cached tokens closer than this to expiry are renewed. AAD issues ~1h tokens, so the
/// margin has to stay well below that for a cached token to be reused at all.
pub const REFRESH_WITHIN_SECONDS: i64 = 5 * 60;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// unix seconds, sent as a string by the v1 endpoint
    #[serde(default, deserialize_with = "flexible_i64")]
    expires_on: Option<i64>,
    #[serde(default, deserialize_with = "flexible_i64")]
    expires_in: Option<i64>,
}

fn flexible_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

/// Client-credentials grant against Azure AD for the Resource Manager audience.
pub struct ServicePrincipalTokenProvider {
    client: Client,
    config: IdentityConfig,
    cached: Mutex<Option<BearerToken>>,
}

impl ServicePrincipalTokenProvider {
    pub fn new(client: Client, config: IdentityConfig) -> Self {
        Self {
            client,
            config,
            cached: Mutex::new(None),
        }
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/token",
            self.config.authority_host.trim_end_matches('/'),
            self.config.tenant_id
        )
    }

    async fn request_token(&self) -> Result<BearerToken, CycleError> {
        let auth_error = |reason: String| CycleError::Authentication {
            tenant: self.config.tenant_id.to_owned(),
            reason,
        };

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("resource", self.config.resource_manager.as_str()),
        ];
        let response = self
            .client
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| auth_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(auth_error(format!("token endpoint returned {}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| auth_error(format!("invalid token response: {}", e)))?;

        let expires_on = token
            .expires_on
            .or_else(|| token.expires_in.map(|secs| now_i64() + secs))
            .and_then(from_unix);

        info!(tenant = %self.config.tenant_id, expires_on = ?expires_on, "service principal token acquired");
        Ok(BearerToken::new(token.access_token, expires_on))
    }
}

impl BearerTokenProvider for ServicePrincipalTokenProvider {
    async fn bearer_token(&self) -> Result<BearerToken, CycleError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.expires_within(REFRESH_WITHIN_SECONDS, now()) {
                debug!("reusing cached service principal token");
                return Ok(token.clone());
            }
        }

        let token = self.request_token().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}
