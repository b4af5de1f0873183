//! Per-request state machine: classify the path, check the session, act.

use axum::extract::{Request, State};
use axum::http::header::{HeaderValue, LOCATION};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use log::*;

use crate::classify::{Classification, ControlEndpoint};
use crate::controller::{callback_controller, logout_controller};
use crate::error::{Error, WebErrorKind};
use crate::resolve::{self, AssetKind, ResolveError};
use crate::session::SessionValidity;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Allow-listed path, served without looking at the session.
    ServePublic,
    ServeAsset,
    ServePage,
    CompleteLogin,
    Logout,
    /// Plain 401. Assets never get a login redirect.
    RejectUnauthorized,
    RedirectToLogin,
}

/// The transition table. Session validity only matters for assets and pages.
pub fn decide(classification: Classification, validity: SessionValidity) -> Action {
    use SessionValidity::*;

    match (classification, validity) {
        (Classification::AlwaysAllowedAsset, _) => Action::ServePublic,
        (Classification::ControlEndpoint(ControlEndpoint::Callback), _) => Action::CompleteLogin,
        (Classification::ControlEndpoint(ControlEndpoint::Logout), _) => Action::Logout,
        (Classification::StaticAsset, Valid) => Action::ServeAsset,
        (Classification::StaticAsset, Invalid) => Action::RejectUnauthorized,
        (Classification::ProtectedPage, Valid) => Action::ServePage,
        (Classification::ProtectedPage, Invalid) => Action::RedirectToLogin,
    }
}

/// Router fallback; every request passes through here.
pub async fn dispatch(
    State(app_state): State<AppState>,
    jar: CookieJar,
    request: Request,
) -> Response {
    let path = match urlencoding::decode(request.uri().path()) {
        Ok(path) => path.into_owned(),
        Err(_) => {
            warn!("Rejecting undecodable path {}", request.uri().path());
            return Error::Web(WebErrorKind::Input).into_response();
        }
    };

    let classification = app_state.classifier.classify(&path);
    let validity = app_state.sessions.validity(&jar);
    let action = decide(classification, validity);
    debug!("{path}: {classification:?}, session {validity:?} -> {action:?}");

    match action {
        Action::ServePublic | Action::ServeAsset | Action::ServePage => {
            serve_path(&app_state, &path, request).await
        }
        Action::CompleteLogin => {
            let uri = request.uri().clone();
            callback_controller::callback(&app_state, &uri)
                .await
                .into_response()
        }
        Action::Logout => logout_controller::logout(&app_state),
        Action::RejectUnauthorized => {
            warn!("Blocked unauthenticated request for asset {path}");
            Error::Web(WebErrorKind::Unauthorized).into_response()
        }
        Action::RedirectToLogin => {
            info!("Redirecting unauthenticated request for {path} to login");
            found(&app_state.provider.authorization_url())
        }
    }
}

async fn serve_path(app_state: &AppState, path: &str, request: Request) -> Response {
    let kind = AssetKind::of_request_path(path);
    match app_state.resolver.resolve(path, kind).await {
        Ok(file) => resolve::serve(&file, request).await,
        Err(ResolveError::NotFound) => {
            debug!("Nothing to serve for {path}");
            Error::from(ResolveError::NotFound).into_response()
        }
        Err(err) => {
            warn!("Rejected request for {path} escaping the site root");
            Error::from(err).into_response()
        }
    }
}

/// `302 Found` to `location`.
pub(crate) fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(LOCATION, value)]).into_response(),
        Err(e) => {
            error!("Invalid redirect location {location}: {e}");
            Error::Web(WebErrorKind::Internal).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_CLASSIFICATIONS: [Classification; 5] = [
        Classification::ControlEndpoint(ControlEndpoint::Callback),
        Classification::ControlEndpoint(ControlEndpoint::Logout),
        Classification::AlwaysAllowedAsset,
        Classification::StaticAsset,
        Classification::ProtectedPage,
    ];

    #[test]
    fn test_unauthenticated_assets_are_rejected_and_pages_redirected() {
        assert_eq!(
            decide(Classification::StaticAsset, SessionValidity::Invalid),
            Action::RejectUnauthorized
        );
        assert_eq!(
            decide(Classification::ProtectedPage, SessionValidity::Invalid),
            Action::RedirectToLogin
        );
    }

    #[test]
    fn test_authenticated_requests_are_served() {
        assert_eq!(
            decide(Classification::StaticAsset, SessionValidity::Valid),
            Action::ServeAsset
        );
        assert_eq!(
            decide(Classification::ProtectedPage, SessionValidity::Valid),
            Action::ServePage
        );
    }

    #[test]
    fn test_session_is_irrelevant_for_public_and_control_paths() {
        for validity in [SessionValidity::Valid, SessionValidity::Invalid] {
            assert_eq!(
                decide(Classification::AlwaysAllowedAsset, validity),
                Action::ServePublic
            );
            assert_eq!(
                decide(
                    Classification::ControlEndpoint(ControlEndpoint::Callback),
                    validity
                ),
                Action::CompleteLogin
            );
            assert_eq!(
                decide(
                    Classification::ControlEndpoint(ControlEndpoint::Logout),
                    validity
                ),
                Action::Logout
            );
        }
    }

    #[test]
    fn test_no_invalid_session_is_ever_served_protected_content() {
        for classification in ALL_CLASSIFICATIONS {
            let action = decide(classification, SessionValidity::Invalid);
            assert_ne!(action, Action::ServeAsset);
            assert_ne!(action, Action::ServePage);
        }
    }

    #[test]
    fn test_found_sets_location() {
        let response = found("https://sso.example.com/login");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "https://sso.example.com/login"
        );
    }
}
