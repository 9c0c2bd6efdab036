use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{HeaderValue, header::CACHE_CONTROL, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::errors::AppError;
use crate::logging::SecurityEvent;
use crate::session::{AUTHENTICATED_USER_ID, ORIGINAL_PATH, Session};
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/user/login";

/// Identity of a user whose session points at an existing account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub i32);

/// Marks the request authenticated when the session names a user that
/// still exists.
pub async fn authenticate(
    State(app): State<AppState>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let id = session.get_int(AUTHENTICATED_USER_ID).await?;
    if id != 0 && app.users.exists(id).await? {
        request.extensions_mut().insert(AuthenticatedUser(id));
    }

    Ok(next.run(request).await)
}

/// Sends anonymous visitors to the login page, remembering where they were
/// headed. Pages behind this gate are never cached.
pub async fn require_authentication(
    session: Session,
    user: Option<AuthenticatedUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if user.is_none() {
        let path = request.uri().path().to_string();
        crate::log_security_event!(
            SecurityEvent::UnauthenticatedAccess,
            path = %path,
            "Anonymous request for a protected page"
        );
        session.put(ORIGINAL_PATH, path).await?;
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(Redirect::to(LOGIN_PATH))
    }
}
