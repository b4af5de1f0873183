//! OAuth 2.0 authorization-code flow against a single identity provider.

mod client;
mod credential;
mod provider;

pub use client::{Client, ProviderSettings, TokenResponse};
pub use credential::display_identity;
pub use provider::{DisplayIdentity, Provider};
