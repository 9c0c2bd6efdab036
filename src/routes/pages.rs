use axum::{extract::State, http::StatusCode, response::Response};

use crate::errors::AppError;
use crate::security::auth::AuthenticatedUser;
use crate::session::Session;
use crate::state::AppState;
use crate::templates::TemplateData;

pub async fn about(
    State(app): State<AppState>,
    session: Session,
    user: Option<AuthenticatedUser>,
) -> Result<Response, AppError> {
    let data = TemplateData::new(&session, user.is_some()).await?;
    app.render(StatusCode::OK, "about.html", &data)
}

/// Liveness check; sits outside the session layer.
pub async fn ping() -> &'static str {
    "OK"
}
