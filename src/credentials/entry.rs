use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::errors::DecodeError;

/// Registries ignore basic-auth once an identity token is present, so the username is a fixed sentinel.
pub const PLACEHOLDER_USERNAME: &str = "00000000-0000-0000-0000-000000000000";

/// One registry's current credential.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    pub server: String,
    /// base64 of `<sentinel>:`
    pub auth_blob: String,
    pub refresh_token: String,
    /// `None` when the token payload could not be decoded
    pub valid_until: Option<DateTime<Utc>>,
}

impl CredentialEntry {
    /// Build an entry from a freshly exchanged token.
    ///
    /// A payload that fails to decode does not reject the entry, it only leaves the expiry unknown.
    pub fn build<D>(server: impl Into<String>, refresh_token: impl Into<String>, decode: D) -> Self
    where
        D: FnOnce(&str) -> Result<DateTime<Utc>, DecodeError>,
    {
        let server = server.into();
        let refresh_token = refresh_token.into();
        let valid_until = match decode(&refresh_token) {
            Ok(expiry) => Some(expiry),
            Err(err) => {
                warn!(server = %server, error = %err, "unable to decode token expiry, publishing with unknown expiry");
                None
            }
        };

        Self {
            server,
            auth_blob: placeholder_auth_blob(),
            refresh_token,
            valid_until,
        }
    }
}

impl fmt::Debug for CredentialEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialEntry")
            .field("server", &self.server)
            .field("auth_blob", &self.auth_blob)
            .field("refresh_token", &"***")
            .field("valid_until", &self.valid_until)
            .finish()
    }
}

pub fn placeholder_auth_blob() -> String {
    STANDARD.encode(format!("{}:", PLACEHOLDER_USERNAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_blob_is_sentinel_with_blank_password() {
        let entry = CredentialEntry::build("a.azurecr.io", "tok", |_| Ok(Utc::now()));
        let decoded = STANDARD.decode(&entry.auth_blob).unwrap();
        assert_eq!(
            String::from_utf8(decoded).unwrap(),
            "00000000-0000-0000-0000-000000000000:"
        );
    }

    #[test]
    fn decode_failure_keeps_entry_with_unknown_expiry() {
        let entry = CredentialEntry::build("a.azurecr.io", "opaque", |_| {
            Err(DecodeError::SegmentCount(1))
        });
        assert_eq!(entry.server, "a.azurecr.io");
        assert_eq!(entry.refresh_token, "opaque");
        assert!(entry.valid_until.is_none());
    }

    #[test]
    fn debug_output_hides_refresh_token() {
        let entry = CredentialEntry::build("a.azurecr.io", "super-secret", |_| Ok(Utc::now()));
        assert!(!format!("{:?}", entry).contains("super-secret"));
    }
}
