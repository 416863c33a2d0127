use std::collections::HashSet;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::azure::RegistryEnumerator;
use crate::credentials::{BearerToken, RegistryIdentity};
use crate::errors::CycleError;

pub const REGISTRIES_API_VERSION: &str = "2019-05-01";

#[derive(Debug, Deserialize)]
struct RegistryListResult {
    #[serde(default)]
    value: Vec<Registry>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Registry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    properties: Option<RegistryProperties>,
}

#[derive(Debug, Deserialize)]
struct RegistryProperties {
    #[serde(rename = "loginServer", default)]
    login_server: Option<String>,
}

/// Lists container registries of a subscription through Azure Resource Manager.
pub struct ArmRegistryEnumerator {
    client: Client,
    resource_manager: String,
    tenant_id: String,
}

impl ArmRegistryEnumerator {
    pub fn new(client: Client, resource_manager: &str, tenant_id: &str) -> Self {
        Self {
            client,
            resource_manager: resource_manager.trim_end_matches('/').to_owned(),
            tenant_id: tenant_id.to_owned(),
        }
    }

    fn list_url(&self, subscription_id: &str) -> String {
        format!(
            "{}/subscriptions/{}/providers/Microsoft.ContainerRegistry/registries?api-version={}",
            self.resource_manager, subscription_id, REGISTRIES_API_VERSION
        )
    }
}

impl RegistryEnumerator for ArmRegistryEnumerator {
    async fn list_registries(
        &self,
        subscription_id: &str,
        bearer: &BearerToken,
    ) -> Result<Vec<RegistryIdentity>, CycleError> {
        let enumeration_error = |reason: String| CycleError::Enumeration {
            subscription: subscription_id.to_owned(),
            reason,
        };

        let mut identities = Vec::new();
        let mut visited = HashSet::new();
        let mut next_url = Some(self.list_url(subscription_id));

        while let Some(url) = next_url.take() {
            if !visited.insert(url.clone()) {
                warn!(subscription = %subscription_id, url = %url, "registry list nextLink repeats a fetched page, stopping");
                break;
            }
            debug!(url = %url, "listing registries");
            let response = self
                .client
                .get(&url)
                .bearer_auth(&bearer.access_token)
                .send()
                .await
                .map_err(|e| enumeration_error(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(enumeration_error(format!("{}: {}", status, body)));
            }

            let page: RegistryListResult = response
                .json()
                .await
                .map_err(|e| enumeration_error(format!("invalid registry list: {}", e)))?;

            for registry in page.value {
                match registry.properties.and_then(|p| p.login_server) {
                    Some(login_server) if !login_server.is_empty() => identities.push(
                        RegistryIdentity::new(login_server, &self.tenant_id, subscription_id),
                    ),
                    _ => debug!(registry = ?registry.name, "registry without login server skipped"),
                }
            }

            next_url = page.next_link.filter(|link| !link.is_empty());
        }

        info!(
            subscription = %subscription_id,
            registries = identities.len(),
            "registries listed"
        );
        Ok(identities)
    }
}
