use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};

use crate::errors::AppError;
use crate::forms::SnippetCreateForm;
use crate::models::ModelError;
use crate::security::auth::{AuthenticatedUser, require_authentication};
use crate::security::form::ValidatedForm;
use crate::session::{FLASH, Session};
use crate::state::AppState;
use crate::templates::TemplateData;

pub fn router() -> Router<AppState> {
    let protected = Router::new()
        .route("/snippet/create", get(snippet_create).post(snippet_create_post))
        .route_layer(middleware::from_fn(require_authentication));

    Router::new()
        .route("/", get(home))
        .route("/snippet/view/:id", get(snippet_view))
        .merge(protected)
}

pub async fn home(
    State(app): State<AppState>,
    session: Session,
    user: Option<AuthenticatedUser>,
) -> Result<Response, AppError> {
    let snippets = app.snippets.latest().await?;

    let mut data = TemplateData::new(&session, user.is_some()).await?;
    data.snippets = snippets;

    app.render(StatusCode::OK, "home.html", &data)
}

/// Identifiers that are not positive integers are a plain 404; the
/// repository is not consulted.
fn parse_snippet_id(raw: &str) -> Option<i32> {
    raw.parse::<i32>().ok().filter(|id| *id >= 1)
}

pub async fn snippet_view(
    State(app): State<AppState>,
    session: Session,
    user: Option<AuthenticatedUser>,
    Path(raw_id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_snippet_id(&raw_id).ok_or(AppError::NotFound)?;

    let snippet = match app.snippets.get(id).await {
        Ok(snippet) => snippet,
        Err(ModelError::NoRecord) => return Err(AppError::NotFound),
        Err(err) => return Err(err.into()),
    };

    let mut data = TemplateData::new(&session, user.is_some()).await?;
    data.snippet = Some(snippet);

    app.render(StatusCode::OK, "view.html", &data)
}

pub async fn snippet_create(
    State(app): State<AppState>,
    session: Session,
    user: Option<AuthenticatedUser>,
) -> Result<Response, AppError> {
    let data = TemplateData::new(&session, user.is_some())
        .await?
        .with_form(&SnippetCreateForm::blank());
    app.render(StatusCode::OK, "create.html", &data)
}

#[tracing::instrument(name = "create_snippet", skip_all, fields(snippet_id))]
pub async fn snippet_create_post(
    State(app): State<AppState>,
    session: Session,
    user: Option<AuthenticatedUser>,
    ValidatedForm(mut form): ValidatedForm<SnippetCreateForm>,
) -> Result<Response, AppError> {
    form.validate();

    if !form.validator.valid() {
        let data = TemplateData::new(&session, user.is_some()).await?.with_form(&form);
        return app.render(StatusCode::UNPROCESSABLE_ENTITY, "create.html", &data);
    }

    let id = app
        .snippets
        .insert(&form.title, &form.content, form.expires)
        .await?;
    tracing::Span::current().record("snippet_id", id);

    session.put(FLASH, "Snippet successfully created!").await?;
    Ok(Redirect::to(&format!("/snippet/view/{id}")).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_snippet_id() {
        assert_eq!(parse_snippet_id("1"), Some(1));
        assert_eq!(parse_snippet_id("42"), Some(42));
        assert_eq!(parse_snippet_id("0"), None);
        assert_eq!(parse_snippet_id("-1"), None);
        assert_eq!(parse_snippet_id("abc"), None);
        assert_eq!(parse_snippet_id("1.23"), None);
        assert_eq!(parse_snippet_id(""), None);
    }
}
