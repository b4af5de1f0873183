//! HTTP surface of the gateway: every request is classified, checked against
//! the session cookie and then served, rejected or redirected.

use std::sync::Arc;
use std::time::Duration;

use identity::oauth::{Client, Provider, ProviderSettings};
use log::*;
use secrecy::SecretString;
use service::config::Config;
use tokio::net::TcpListener;

use crate::classify::Classifier;
use crate::resolve::Resolver;
use crate::session::SessionStore;

pub mod classify;
pub(crate) mod controller;
pub mod dispatch;
pub mod error;
pub mod resolve;
mod router;
pub mod session;

pub use error::{Error, Result};


/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub classifier: Arc<Classifier>,
    pub resolver: Arc<Resolver>,
    pub sessions: SessionStore,
    pub provider: Arc<dyn Provider>,
}

impl AppState {
    pub fn new(
        config: Config,
        provider: Arc<dyn Provider>,
    ) -> core::result::Result<Self, identity::Error> {
        let not_found_page = Some(config.not_found_page.as_str()).filter(|p| !p.is_empty());
        Ok(Self {
            classifier: Arc::new(Classifier::from_config(&config)),
            resolver: Arc::new(Resolver::new(config.site_root(), not_found_page)),
            sessions: SessionStore::from_config(&config)?,
            provider,
            config: Arc::new(config),
        })
    }

    /// Builds the state with the HTTP identity provider client.
    pub fn from_config(config: Config) -> core::result::Result<Self, identity::Error> {
        let settings = ProviderSettings {
            provider_url: config.provider_url().to_string(),
            client_id: config.client_id().to_string(),
            client_secret: SecretString::new(config.client_secret().to_string()),
            app_name: config.app_name().to_string(),
            redirect_uri: config.redirect_uri(),
            post_logout_redirect_uri: config.base_url().to_string(),
            timeout: Duration::from_secs(config.provider_timeout_seconds),
        };
        let provider = Client::new(settings)?;
        Self::new(config, Arc::new(provider))
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let listen_addr = app_state.config.listen_addr();
    info!(
        "Serving {} on {listen_addr}",
        app_state.config.site_root().display()
    );

    let listener = TcpListener::bind(&listen_addr).await?;
    let router = router::define_routes(app_state);

    axum::serve(listener, router).await
}
