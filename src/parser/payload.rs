use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::errors::DecodeError;
use crate::helpers::time::from_unix;

/// Registry tokens are issued both with and without base64 padding.
const URL_SAFE_ANY_PAD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Claims carried in the middle segment of a registry refresh token.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TokenPayload {
    /// unix seconds
    pub exp: i64,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub credential: Option<String>,
}

impl TokenPayload {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        from_unix(self.exp)
    }
}

/// Decode the payload of a dot-delimited compact token.
///
/// Only the second segment is read; the signature is not verified.
pub fn decode_token_payload(token: &str) -> Result<TokenPayload, DecodeError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() < 2 {
        return Err(DecodeError::SegmentCount(segments.len()));
    }

    let decoded = URL_SAFE_ANY_PAD
        .decode(segments[1])
        .map_err(|e| DecodeError::Base64(e.to_string()))?;

    let payload = serde_json::from_slice::<TokenPayload>(&decoded)
        .map_err(|e| DecodeError::Json(e.to_string()))?;

    debug!(exp = payload.exp, "token payload decoded");
    Ok(payload)
}

/// Expiry of a token, the form the entry builder consumes.
pub fn decode_expiry(token: &str) -> Result<DateTime<Utc>, DecodeError> {
    let payload = decode_token_payload(token)?;
    payload
        .expires_at()
        .ok_or_else(|| DecodeError::Json(format!("exp {} out of range", payload.exp)))
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_ANY_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let body = URL_SAFE_ANY_PAD.encode(claims.to_string());
    format!("{}.{}.c2lnbmF0dXJl", header, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE;
    use serde_json::json;

    #[test]
    fn decodes_exp_and_optional_claims() {
        let token = encode_test_token(&json!({"exp": 1_700_000_000, "tenant": "t-1", "credential": "c"}));
        let payload = decode_token_payload(&token).unwrap();
        assert_eq!(payload.exp, 1_700_000_000);
        assert_eq!(payload.tenant.as_deref(), Some("t-1"));
        assert_eq!(payload.credential.as_deref(), Some("c"));
    }

    #[test]
    fn accepts_padded_segments_and_two_segment_tokens() {
        let body = URL_SAFE.encode(json!({"exp": 42}).to_string());
        assert!(body.ends_with('='));
        let payload = decode_token_payload(&format!("header.{}", body)).unwrap();
        assert_eq!(payload.exp, 42);
    }

    #[test]
    fn rejects_single_segment() {
        assert_eq!(
            decode_token_payload("opaque-token-without-dots"),
            Err(DecodeError::SegmentCount(1))
        );
    }

    #[test]
    fn rejects_bad_base64_and_bad_json() {
        assert!(matches!(decode_token_payload("a.!!!.c"), Err(DecodeError::Base64(_))));

        let not_json = URL_SAFE_ANY_PAD.encode("not json");
        assert!(matches!(
            decode_token_payload(&format!("a.{}.c", not_json)),
            Err(DecodeError::Json(_))
        ));

        let no_exp = URL_SAFE_ANY_PAD.encode(json!({"tenant": "t"}).to_string());
        assert!(matches!(
            decode_token_payload(&format!("a.{}.c", no_exp)),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn decode_expiry_returns_instant() {
        let token = encode_test_token(&json!({"exp": 1_700_000_000}));
        assert_eq!(decode_expiry(&token).unwrap().timestamp(), 1_700_000_000);
    }
}
