use std::fmt;

use chrono::{DateTime, Utc};

/// One registry as enumerated from a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryIdentity {
    /// e.g. myregistry.azurecr.io
    pub login_server: String,
    pub tenant_id: String,
    pub subscription_id: String,
}

impl RegistryIdentity {
    pub fn new(
        login_server: impl Into<String>,
        tenant_id: impl Into<String>,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            login_server: login_server.into(),
            tenant_id: tenant_id.into(),
            subscription_id: subscription_id.into(),
        }
    }
}

/// Access token for the cloud management plane.
#[derive(Clone)]
pub struct BearerToken {
    pub access_token: String,
    pub expires_on: Option<DateTime<Utc>>,
}

impl BearerToken {
    pub fn new(access_token: impl Into<String>, expires_on: Option<DateTime<Utc>>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_on,
        }
    }

    /// True when the token expires within `within_seconds` of `now` (or expiry is unknown).
    pub fn expires_within(&self, within_seconds: i64, now: DateTime<Utc>) -> bool {
        self.expires_on
            .map(|exp| (exp - now).num_seconds() < within_seconds)
            .unwrap_or(true)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("access_token", &"***")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}
