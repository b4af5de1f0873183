use axum::response::Response;
use log::*;

use crate::dispatch::found;
use crate::session::append_cookies;
use crate::AppState;

/// GET {logout_path}
///
/// Expires both cookies and hands the browser to the provider's logout
/// endpoint, which sends it back to the site. Safe to repeat.
pub fn logout(app_state: &AppState) -> Response {
    info!("Logging out");
    let mut response = found(&app_state.provider.logout_url());
    append_cookies(response.headers_mut(), app_state.sessions.revoke());
    response
}
