//! Display name extraction from the provider's access token.
//!
//! The token is a three-part dot-delimited credential whose middle segment is
//! a base64url JSON claim set. The signature segment is not verified: the
//! token arrives straight from the provider's token endpoint over a
//! configuration-trusted channel, and the claims are only used for display.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::Value;

use super::DisplayIdentity;
use crate::error::{credential_error, CredentialErrorKind, Error};

/// Read the display identity out of an access token.
///
/// Uses the `name` claim, falling back to `id`. A readable credential with
/// neither claim yields the placeholder identity.
pub fn display_identity(credential: &str) -> Result<DisplayIdentity, Error> {
    let payload = credential.split('.').nth(1).ok_or_else(|| {
        credential_error(
            CredentialErrorKind::MissingPayload,
            "credential has fewer than two segments",
        )
    })?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: crate::ErrorKind::Credential(CredentialErrorKind::InvalidEncoding),
        })?;

    let claims: Value = serde_json::from_slice(&bytes).map_err(|e| Error {
        source: Some(Box::new(e)),
        error_kind: crate::ErrorKind::Credential(CredentialErrorKind::InvalidClaims),
    })?;
    if !claims.is_object() {
        return Err(credential_error(
            CredentialErrorKind::InvalidClaims,
            "claim payload is not a JSON object",
        ));
    }

    let name = claim(&claims, "name").or_else(|| claim(&claims, "id"));
    Ok(name.map_or_else(DisplayIdentity::placeholder, DisplayIdentity::new))
}

fn claim(claims: &Value, key: &str) -> Option<String> {
    match claims.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn token(claims: &str) -> String {
        format!(
            "eyJhbGciOiJSUzI1NiJ9.{}.c2lnbmF0dXJl",
            URL_SAFE_NO_PAD.encode(claims)
        )
    }

    #[test]
    fn test_name_claim_wins() {
        let identity = display_identity(&token(r#"{"name":"alice","id":"u-1"}"#)).unwrap();
        assert_eq!(identity.as_str(), "alice");
    }

    #[test]
    fn test_id_claim_used_when_name_missing_or_empty() {
        let identity = display_identity(&token(r#"{"id":"u-1"}"#)).unwrap();
        assert_eq!(identity.as_str(), "u-1");

        let identity = display_identity(&token(r#"{"name":"","id":"u-2"}"#)).unwrap();
        assert_eq!(identity.as_str(), "u-2");
    }

    #[test]
    fn test_placeholder_when_no_usable_claim() {
        let identity = display_identity(&token(r#"{"sub":"x"}"#)).unwrap();
        assert!(identity.is_placeholder());
    }

    #[test]
    fn test_non_ascii_name_survives() {
        let identity = display_identity(&token(r#"{"name":"李雷"}"#)).unwrap();
        assert_eq!(identity.as_str(), "李雷");
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        let padded = format!(
            "h.{}.s",
            base64::engine::general_purpose::URL_SAFE.encode(r#"{"name":"bob"}"#)
        );
        assert_eq!(display_identity(&padded).unwrap().as_str(), "bob");
    }

    #[test]
    fn test_two_segments_are_enough() {
        let two = format!("h.{}", URL_SAFE_NO_PAD.encode(r#"{"name":"carol"}"#));
        assert_eq!(display_identity(&two).unwrap().as_str(), "carol");
    }

    #[test]
    fn test_single_segment_is_an_error() {
        let err = display_identity("opaque-token").unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::Credential(CredentialErrorKind::MissingPayload)
        );
        assert!(display_identity("").is_err());
    }

    #[test]
    fn test_bad_encoding_is_an_error() {
        let err = display_identity("h.!!!.s").unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::Credential(CredentialErrorKind::InvalidEncoding)
        );
    }

    #[test]
    fn test_non_object_payload_is_an_error() {
        let err = display_identity(&token("[1,2,3]")).unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::Credential(CredentialErrorKind::InvalidClaims)
        );
    }
}
