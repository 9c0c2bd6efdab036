use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::errors::AppError;
use crate::models::{SnippetRepository, UserRepository};
use crate::templates::{TemplateCache, TemplateData};

/// Dependencies shared by every handler, built once in `main`.
#[derive(Clone)]
pub struct AppState {
    pub snippets: Arc<dyn SnippetRepository>,
    pub users: Arc<dyn UserRepository>,
    pub templates: Arc<TemplateCache>,
    pub debug: bool,
}

impl AppState {
    pub fn render(
        &self,
        status: StatusCode,
        page: &str,
        data: &TemplateData,
    ) -> Result<Response, AppError> {
        let body = self.templates.render(page, data)?;
        Ok((status, Html(body)).into_response())
    }
}
