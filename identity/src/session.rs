//! Stateless, signed session markers.
//!
//! A marker has the form `<expires_unix>.<hex hmac-sha256>` where the MAC
//! covers the expiry. Validity is decided from the marker alone: no server-side
//! session storage exists.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use log::*;
use rand::Rng;
use sha2::Sha256;

use crate::error::{session_error, Error, SessionErrorKind};

type HmacSha256 = Hmac<Sha256>;

/// Issues and validates session markers with a shared secret.
#[derive(Clone)]
pub struct MarkerSigner {
    /// Keyed once; cloned for every marker.
    mac: HmacSha256,
    max_age: Duration,
}

impl MarkerSigner {
    /// Create a signer from a configured secret.
    ///
    /// # Arguments
    ///
    /// * `secret` - Signing secret shared by every gateway instance
    /// * `max_age` - Lifetime of an issued marker
    pub fn new(secret: &[u8], max_age: Duration) -> Result<Self, Error> {
        let mac = HmacSha256::new_from_slice(secret)
            .map_err(|_| session_error(SessionErrorKind::InvalidKey, "invalid HMAC key"))?;
        Ok(Self { mac, max_age })
    }

    /// Create a signer with a random secret. Markers issued by it do not
    /// survive a restart.
    pub fn with_random_secret(max_age: Duration) -> Result<Self, Error> {
        let secret: [u8; 32] = rand::thread_rng().gen();
        Self::new(&secret, max_age)
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Issue a marker valid until `now + max_age`.
    pub fn issue(&self, now: DateTime<Utc>) -> String {
        let expires = (now + self.max_age).timestamp();
        format!("{expires}.{}", hex::encode(self.sign(expires)))
    }

    /// Validate a marker against `now`.
    pub fn validate(&self, marker: &str, now: DateTime<Utc>) -> Result<(), Error> {
        let (expires, signature) = marker
            .split_once('.')
            .ok_or_else(|| session_error(SessionErrorKind::Malformed, "missing separator"))?;
        let expires: i64 = expires
            .parse()
            .map_err(|_| session_error(SessionErrorKind::Malformed, "expiry is not a number"))?;
        let signature = hex::decode(signature)
            .map_err(|_| session_error(SessionErrorKind::Malformed, "signature is not hex"))?;

        let mut mac = self.mac.clone();
        mac.update(expires.to_string().as_bytes());
        mac.verify_slice(&signature).map_err(|_| {
            session_error(SessionErrorKind::InvalidSignature, "signature mismatch")
        })?;

        if expires <= now.timestamp() {
            return Err(session_error(SessionErrorKind::Expired, "marker expired"));
        }
        Ok(())
    }

    /// Convenience predicate over [`MarkerSigner::validate`].
    pub fn is_valid(&self, marker: &str, now: DateTime<Utc>) -> bool {
        match self.validate(marker, now) {
            Ok(()) => true,
            Err(e) => {
                debug!("Rejected session marker: {e}");
                false
            }
        }
    }

    fn sign(&self, expires: i64) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(expires.to_string().as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}
