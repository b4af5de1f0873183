//! HTTP client for the identity provider's OAuth endpoints.
//!
//! Endpoint layout follows Casdoor:
//! - `GET  {provider}/login/oauth/authorize`
//! - `POST {provider}/api/login/oauth/access_token`
//! - `GET  {provider}/api/logout`

use std::time::Duration;

use async_trait::async_trait;
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::credential::display_identity;
use super::{DisplayIdentity, Provider};
use crate::error::{oauth_error, Error, OAuthErrorKind};
use crate::http::HttpClientBuilder;

/// Scope requested from the provider.
const SCOPE: &str = "read";

/// Everything needed to talk to the provider on behalf of this gateway.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Provider base URL without a trailing slash.
    pub provider_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// Sent as the `state` parameter of the authorization request.
    pub app_name: String,
    /// Absolute callback URL registered with the provider.
    pub redirect_uri: String,
    /// Where the provider sends the browser after logging out.
    pub post_logout_redirect_uri: String,
    /// Bound on the token exchange round trip.
    pub timeout: Duration,
}

/// Token endpoint response. Casdoor reports some failures with a 2xx status
/// and an `error` field, so both shapes are accepted here.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Request to exchange authorization code for tokens
#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

/// OAuth client for the configured identity provider.
pub struct Client {
    http_client: reqwest::Client,
    settings: ProviderSettings,
}

impl Client {
    /// Create a new provider client with a timeout-bounded HTTP client.
    pub fn new(settings: ProviderSettings) -> Result<Self, Error> {
        let http_client = HttpClientBuilder::new()
            .with_timeout(settings.timeout)
            .build()?;
        Ok(Self {
            http_client,
            settings,
        })
    }

    fn token_url(&self) -> String {
        format!(
            "{}/api/login/oauth/access_token",
            self.settings.provider_url
        )
    }

    /// POST the authorization code to the token endpoint and return the
    /// access token.
    pub async fn request_token(&self, code: &str) -> Result<String, Error> {
        let request = TokenExchangeRequest {
            grant_type: "authorization_code",
            client_id: &self.settings.client_id,
            client_secret: self.settings.client_secret.expose_secret(),
            code,
        };

        debug!("Exchanging authorization code at {}", self.token_url());

        let response = self
            .http_client
            .post(self.token_url())
            .form(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach token endpoint: {e}");
                Error::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Token endpoint returned {status}: {error_text}");
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("token endpoint returned {status}"),
            ));
        }

        let tokens: TokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse token response: {e}");
            Error {
                source: Some(Box::new(e)),
                error_kind: crate::ErrorKind::OAuth(OAuthErrorKind::InvalidResponse),
            }
        })?;

        if let Some(error) = tokens.error.filter(|e| !e.is_empty()) {
            let description = tokens.error_description.unwrap_or_default();
            warn!("Token endpoint refused the code: {error} {description}");
            return Err(oauth_error(OAuthErrorKind::TokenExchangeFailed, &error));
        }

        match tokens.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(oauth_error(
                OAuthErrorKind::InvalidResponse,
                "token response carried no access_token",
            )),
        }
    }
}

#[async_trait]
impl Provider for Client {
    fn authorization_url(&self) -> String {
        format!(
            "{}/login/oauth/authorize?\
            client_id={}&\
            response_type=code&\
            redirect_uri={}&\
            scope={}&\
            state={}",
            self.settings.provider_url,
            urlencoding::encode(&self.settings.client_id),
            urlencoding::encode(&self.settings.redirect_uri),
            SCOPE,
            urlencoding::encode(&self.settings.app_name)
        )
    }

    fn logout_url(&self) -> String {
        format!(
            "{}/api/logout?redirect_uri={}",
            self.settings.provider_url,
            urlencoding::encode(&self.settings.post_logout_redirect_uri)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<DisplayIdentity, Error> {
        let access_token = self.request_token(code).await?;
        let identity = display_identity(&access_token)?;
        info!("Exchanged authorization code for identity {identity}");
        Ok(identity)
    }
}
