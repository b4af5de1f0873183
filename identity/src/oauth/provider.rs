//! OAuth provider trait and types.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Human-readable name of an authenticated visitor, used only for UI
/// personalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayIdentity(String);

impl DisplayIdentity {
    /// Name used when the provider's credential carries no usable claim.
    pub const PLACEHOLDER: &'static str = "Guest";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn placeholder() -> Self {
        Self(Self::PLACEHOLDER.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        self.0 == Self::PLACEHOLDER
    }
}

impl fmt::Display for DisplayIdentity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for the identity provider the gateway delegates logins to.
///
/// The HTTP implementation is [`crate::oauth::Client`]; the web layer only
/// depends on this trait so it can be exercised without a live provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// URL of the provider's authorization endpoint, carrying client id,
    /// scope, callback redirect target and application state.
    fn authorization_url(&self) -> String;

    /// URL of the provider's logout endpoint, returning to the gateway.
    fn logout_url(&self) -> String;

    /// Exchange an authorization code for a credential and read the display
    /// name out of it.
    ///
    /// # Errors
    ///
    /// * `Http` kinds when the provider could not be reached in time
    /// * `OAuth` kinds when the provider refused the code
    /// * `Credential` kinds when a token was issued but could not be read
    async fn exchange_code(&self, code: &str) -> Result<DisplayIdentity, Error>;
}
