//! Error types for the `identity` crate.
//!
//! A root `Error` struct carries an error kind tree and an optional source for
//! error chaining.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for the identity crate.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in identity.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    OAuth(OAuthErrorKind),
    Credential(CredentialErrorKind),
    Session(SessionErrorKind),
    Http(HttpErrorKind),
}

/// Errors reported by the identity provider itself.
#[derive(Debug, PartialEq)]
pub enum OAuthErrorKind {
    /// The token endpoint answered with a non-2xx status or an OAuth error body.
    TokenExchangeFailed,
    /// The token endpoint answered 2xx without a usable `access_token`.
    InvalidResponse,
}

/// Errors while reading the credential returned by the token endpoint.
#[derive(Debug, PartialEq)]
pub enum CredentialErrorKind {
    /// Fewer than two dot-delimited segments.
    MissingPayload,
    /// Payload segment is not base64url.
    InvalidEncoding,
    /// Payload is not a JSON object.
    InvalidClaims,
}

/// Errors from session marker validation.
#[derive(Debug, PartialEq)]
pub enum SessionErrorKind {
    Malformed,
    InvalidSignature,
    Expired,
    /// The signing secret was rejected as an HMAC key.
    InvalidKey,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    Timeout,
    Network,
}

impl Error {
    /// True when the provider accepted the code but handed back a credential
    /// this crate could not read.
    pub fn is_malformed_credential(&self) -> bool {
        matches!(self.error_kind, ErrorKind::Credential(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::OAuth(kind) => write!(f, "OAuth error: {:?}", kind),
            ErrorKind::Credential(kind) => write!(f, "Credential error: {:?}", kind),
            ErrorKind::Session(kind) => write!(f, "Session error: {:?}", kind),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_timeout() {
            ErrorKind::Http(HttpErrorKind::Timeout)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Helper function to create credential errors.
pub fn credential_error(kind: CredentialErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Credential(kind),
    }
}

/// Helper function to create session errors.
pub fn session_error(kind: SessionErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Session(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_category() {
        let err = oauth_error(OAuthErrorKind::TokenExchangeFailed, "401");
        assert_eq!(err.to_string(), "OAuth error: TokenExchangeFailed");

        let err = credential_error(CredentialErrorKind::MissingPayload, "no dot");
        assert_eq!(err.to_string(), "Credential error: MissingPayload");
    }

    #[test]
    fn test_only_credential_errors_are_malformed_credentials() {
        assert!(credential_error(CredentialErrorKind::InvalidClaims, "x").is_malformed_credential());
        assert!(!oauth_error(OAuthErrorKind::TokenExchangeFailed, "x").is_malformed_credential());
        assert!(!session_error(SessionErrorKind::Expired, "x").is_malformed_credential());
    }
}
