use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};

use crate::errors::AppError;
use crate::forms::PasswordUpdateForm;
use crate::logging::SecurityEvent;
use crate::models::ModelError;
use crate::security::auth::{AuthenticatedUser, LOGIN_PATH, require_authentication};
use crate::security::form::ValidatedForm;
use crate::session::{AUTHENTICATED_USER_ID, FLASH, Session};
use crate::state::AppState;
use crate::templates::TemplateData;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/account/view", get(account_view))
        .route(
            "/account/password/update",
            get(password_update).post(password_update_post),
        )
        .route_layer(middleware::from_fn(require_authentication))
}

/// A session whose user has vanished is sent back to log in.
pub async fn account_view(
    State(app): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    let id = session.get_int(AUTHENTICATED_USER_ID).await?;
    if id == 0 {
        return Ok(Redirect::to(LOGIN_PATH).into_response());
    }

    let user = match app.users.get(id).await {
        Ok(user) => user,
        Err(ModelError::NoRecord) => return Ok(Redirect::to(LOGIN_PATH).into_response()),
        Err(err) => return Err(err.into()),
    };

    let mut data = TemplateData::new(&session, true).await?;
    data.user = Some(user);

    app.render(StatusCode::OK, "account.html", &data)
}

pub async fn password_update(
    State(app): State<AppState>,
    session: Session,
) -> Result<Response, AppError> {
    let data = TemplateData::new(&session, true).await?.with_form(&PasswordUpdateForm::default());
    app.render(StatusCode::OK, "password.html", &data)
}

#[tracing::instrument(name = "update_password", skip_all, fields(user_id = user.0))]
pub async fn password_update_post(
    State(app): State<AppState>,
    session: Session,
    user: AuthenticatedUser,
    ValidatedForm(mut form): ValidatedForm<PasswordUpdateForm>,
) -> Result<Response, AppError> {
    form.validate();

    if !form.validator.valid() {
        let data = TemplateData::new(&session, true).await?.with_form(&form);
        return app.render(StatusCode::UNPROCESSABLE_ENTITY, "password.html", &data);
    }

    let AuthenticatedUser(id) = user;
    match app
        .users
        .password_update(id, &form.current_password, &form.new_password)
        .await
    {
        Ok(()) => {}
        Err(ModelError::InvalidCredentials) => {
            crate::log_security_event!(
                SecurityEvent::PasswordChangeFailure,
                user_id = id,
                "Password change rejected: current password incorrect"
            );
            form.validator
                .add_field_error("currentPassword", "Password is incorrect");

            let data = TemplateData::new(&session, true).await?.with_form(&form);
            return app.render(StatusCode::UNPROCESSABLE_ENTITY, "password.html", &data);
        }
        Err(ModelError::NoRecord) => return Ok(Redirect::to(LOGIN_PATH).into_response()),
        Err(err) => return Err(err.into()),
    }

    crate::log_security_event!(SecurityEvent::PasswordChanged, user_id = id, "Password updated");

    session.put(FLASH, "Your password has been successfully updated.").await?;
    Ok(Redirect::to("/account/view").into_response())
}
