use axum::Router;

use crate::dispatch::dispatch;
use crate::AppState;

/// The gateway has no fixed routes: control endpoints are configurable and
/// are recognised by the classifier, so everything goes to the dispatcher.
pub fn define_routes(app_state: AppState) -> Router {
    Router::new().fallback(dispatch).with_state(app_state)
}
