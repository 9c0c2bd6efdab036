use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use crate::errors::AppError;
use crate::forms::{UserLoginForm, UserSignupForm};
use crate::logging::{SanitizedEmail, SecurityEvent};
use crate::models::ModelError;
use crate::security::auth::{AuthenticatedUser, LOGIN_PATH};
use crate::security::form::ValidatedForm;
use crate::session::{AUTHENTICATED_USER_ID, FLASH, ORIGINAL_PATH, Session};
use crate::state::AppState;
use crate::templates::TemplateData;

const AFTER_LOGIN_PATH: &str = "/snippet/create";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/signup", get(user_signup).post(user_signup_post))
        .route("/user/login", get(user_login).post(user_login_post))
        .route("/user/logout", post(user_logout_post))
}

pub async fn user_signup(
    State(app): State<AppState>,
    session: Session,
    user: Option<AuthenticatedUser>,
) -> Result<Response, AppError> {
    let data = TemplateData::new(&session, user.is_some())
        .await?
        .with_form(&UserSignupForm::default());
    app.render(StatusCode::OK, "signup.html", &data)
}

#[tracing::instrument(name = "signup_user", skip_all, fields(email))]
pub async fn user_signup_post(
    State(app): State<AppState>,
    session: Session,
    user: Option<AuthenticatedUser>,
    ValidatedForm(mut form): ValidatedForm<UserSignupForm>,
) -> Result<Response, AppError> {
    tracing::Span::current().record(
        "email",
        tracing::field::display(SanitizedEmail::new(&form.email)),
    );

    form.validate();

    if !form.validator.valid() {
        let data = TemplateData::new(&session, user.is_some()).await?.with_form(&form);
        return app.render(StatusCode::UNPROCESSABLE_ENTITY, "signup.html", &data);
    }

    match app.users.insert(&form.name, &form.email, &form.password).await {
        Ok(()) => {}
        Err(ModelError::DuplicateEmail) => {
            crate::log_security_event!(
                SecurityEvent::SignupFailure,
                email = %SanitizedEmail::new(&form.email),
                reason = "duplicate_email",
                "Signup rejected: email already registered"
            );
            form.validator
                .add_field_error("email", "Email address is already in use");

            let data = TemplateData::new(&session, user.is_some()).await?.with_form(&form);
            return app.render(StatusCode::UNPROCESSABLE_ENTITY, "signup.html", &data);
        }
        Err(err) => return Err(err.into()),
    }

    crate::log_security_event!(
        SecurityEvent::SignupSuccess,
        email = %SanitizedEmail::new(&form.email),
        "User signed up"
    );

    session.put(FLASH, "Your signup was successful. Please log in.").await?;
    Ok(Redirect::to(LOGIN_PATH).into_response())
}

pub async fn user_login(
    State(app): State<AppState>,
    session: Session,
    user: Option<AuthenticatedUser>,
) -> Result<Response, AppError> {
    let data = TemplateData::new(&session, user.is_some())
        .await?
        .with_form(&UserLoginForm::default());
    app.render(StatusCode::OK, "login.html", &data)
}

#[tracing::instrument(name = "login_user", skip_all, fields(email, user_id))]
pub async fn user_login_post(
    State(app): State<AppState>,
    session: Session,
    user: Option<AuthenticatedUser>,
    ValidatedForm(mut form): ValidatedForm<UserLoginForm>,
) -> Result<Response, AppError> {
    tracing::Span::current().record(
        "email",
        tracing::field::display(SanitizedEmail::new(&form.email)),
    );

    form.validate();

    if !form.validator.valid() {
        let data = TemplateData::new(&session, user.is_some()).await?.with_form(&form);
        return app.render(StatusCode::UNPROCESSABLE_ENTITY, "login.html", &data);
    }

    let id = match app.users.authenticate(&form.email, &form.password).await {
        Ok(id) => id,
        Err(ModelError::InvalidCredentials) => {
            crate::log_security_event!(
                SecurityEvent::LoginFailure,
                email = %SanitizedEmail::new(&form.email),
                "Login failed: invalid credentials"
            );
            form.validator
                .add_non_field_error("Email or password is incorrect");

            let data = TemplateData::new(&session, user.is_some()).await?.with_form(&form);
            return app.render(StatusCode::UNPROCESSABLE_ENTITY, "login.html", &data);
        }
        Err(err) => return Err(err.into()),
    };

    tracing::Span::current().record("user_id", id);

    session.renew_token().await?;
    session.put(AUTHENTICATED_USER_ID, id).await?;

    crate::log_security_event!(
        SecurityEvent::LoginSuccess,
        user_id = id,
        email = %SanitizedEmail::new(&form.email),
        "User logged in"
    );

    let destination = session
        .pop_string(ORIGINAL_PATH)
        .await?
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| AFTER_LOGIN_PATH.to_string());

    Ok(Redirect::to(&destination).into_response())
}

/// Logging out an anonymous session only renews its token.
pub async fn user_logout_post(session: Session) -> Result<Response, AppError> {
    let user_id = session.get_int(AUTHENTICATED_USER_ID).await?;

    session.renew_token().await?;
    session.remove(AUTHENTICATED_USER_ID).await?;
    session.put(FLASH, "You've been logged out successfully!").await?;

    crate::log_security_event!(SecurityEvent::Logout, user_id, "User logged out");

    Ok(Redirect::to("/").into_response())
}
