//! # identity
//!
//! Everything the gateway needs to talk to its OAuth identity provider and to
//! recognise an authenticated browser:
//! - authorization-code exchange against the provider's token endpoint
//! - display name extraction from the returned credential
//! - stateless, signed session markers
//! - HTTP client building with a bounded timeout
//!
//! ## Usage
//!
//! ```rust,ignore
//! use identity::{
//!     oauth::{Client, Provider, ProviderSettings},
//!     session::MarkerSigner,
//! };
//! ```

pub mod error;
pub mod http;
pub mod oauth;
pub mod session;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use oauth::DisplayIdentity;
