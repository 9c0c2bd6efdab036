use std::path::Path;
use std::time::Duration;

use axum::{Router, extract::DefaultBodyLimit, middleware, routing::get};
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, timeout::TimeoutLayer};
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::errors::recover_panic;
use crate::logging::log_request;
use crate::security::auth::authenticate;
use crate::security::csrf::verify_csrf;
use crate::security::form::MAX_BODY_SIZE_BYTES;
use crate::security::headers::set_security_headers;
use crate::state::AppState;

pub mod account;
pub mod pages;
pub mod snippets;
pub mod users;


/// Builds the full application. Layers run outermost first: request
/// logging, panic recovery, timeout, security headers, then (for dynamic
/// pages only) the session, the CSRF check and authentication.
pub fn create_router<Store>(
    state: AppState,
    sessions: SessionManagerLayer<Store>,
    static_dir: &Path,
    request_timeout: Duration,
) -> Router
where
    Store: SessionStore + Clone,
{
    tracing::debug!(static_dir = %static_dir.display(), "Creating application router");

    let dynamic = Router::new()
        .route("/about", get(pages::about))
        .merge(snippets::router())
        .merge(users::router())
        .merge(account::router())
        .layer(middleware::from_fn_with_state(state.clone(), authenticate))
        .layer(middleware::from_fn(verify_csrf))
        .layer(sessions);

    Router::new()
        .route("/ping", get(pages::ping))
        .nest_service("/static", ServeDir::new(static_dir))
        .merge(dynamic)
        .layer(middleware::from_fn(set_security_headers))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE_BYTES))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CatchPanicLayer::custom(recover_panic))
        .layer(middleware::from_fn_with_state(state.clone(), log_request))
        .with_state(state)
}
