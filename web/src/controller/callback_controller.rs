//! OAuth redirect target: trades the authorization code for a display
//! identity and starts a session.

use axum::extract::Query;
use axum::http::Uri;
use axum::response::Response;
use identity::DisplayIdentity;
use log::*;
use serde::Deserialize;

use crate::dispatch::found;
use crate::error::{Error, WebErrorKind};
use crate::session::append_cookies;
use crate::AppState;

/// Where the browser lands after a successful login.
const POST_LOGIN_LOCATION: &str = "/";

/// Query parameters for OAuth callback
#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// GET {callback_path}?code=...&state=...
///
/// A provider that cannot be reached or refuses the code yields a 502 and no
/// session. A provider that issues a credential we cannot read still logs the
/// visitor in, under the placeholder identity.
pub async fn callback(app_state: &AppState, uri: &Uri) -> Result<Response, Error> {
    let Query(params) = Query::<CallbackParams>::try_from_uri(uri).map_err(|e| {
        warn!("Malformed callback query: {e}");
        Error::Web(WebErrorKind::Input)
    })?;

    let code = params
        .code
        .filter(|code| !code.is_empty())
        .ok_or_else(|| {
            warn!("Callback request without an authorization code");
            Error::Web(WebErrorKind::Input)
        })?;

    debug!("Callback state: {:?}", params.state);

    let identity = match app_state.provider.exchange_code(&code).await {
        Ok(identity) => identity,
        Err(e) if e.is_malformed_credential() => {
            warn!(
                "Unreadable credential from provider ({e}), continuing as {}",
                DisplayIdentity::PLACEHOLDER
            );
            DisplayIdentity::placeholder()
        }
        Err(e) => {
            warn!("Authorization code exchange failed: {e}");
            return Err(e.into());
        }
    };

    info!("Login completed for {identity}");

    let mut response = found(POST_LOGIN_LOCATION);
    append_cookies(response.headers_mut(), app_state.sessions.issue(&identity));
    Ok(response)
}
