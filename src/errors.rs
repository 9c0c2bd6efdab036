use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error as StdError;

use axum::{
    http::{HeaderValue, StatusCode, header::CONNECTION},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::models::ModelError;
use crate::session::SessionError;

/// Centralized handler error. Expected domain conditions are resolved inside
/// the handlers; whatever reaches this type becomes a bare status response.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("resource not found")]
    NotFound,

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("the template {0} does not exist")]
    TemplateNotFound(String),

    #[error("failed to render template {page}")]
    Template {
        page: String,
        #[source]
        source: minijinja::Error,
    },
}

/// Context for a 500 response, attached to the response so the request
/// logger can record it alongside the method and URI.
#[derive(Debug, Clone)]
pub struct ServerFault {
    pub message: String,
    pub trace: String,
}

impl ServerFault {
    pub fn capture(error: &(dyn StdError + 'static)) -> Self {
        Self {
            message: error_chain(error),
            trace: Backtrace::force_capture().to_string(),
        }
    }
}

/// Joins an error and its sources into one line.
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound | AppError::Model(ModelError::NoRecord) => StatusCode::NOT_FOUND,
            AppError::Model(_)
            | AppError::Session(_)
            | AppError::TemplateNotFound(_)
            | AppError::Template { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A bare status response whose body is the canonical reason phrase.
pub fn status_response(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or("Unknown Status");
    (status, reason.to_string()).into_response()
}

/// Response for a handler that panicked. The connection is closed after it.
pub fn recover_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else {
        "unknown panic payload".to_string()
    };

    let mut response = status_response(StatusCode::INTERNAL_SERVER_ERROR);
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));
    response.extensions_mut().insert(ServerFault {
        message: format!("handler panicked: {message}"),
        trace: Backtrace::force_capture().to_string(),
    });
    response
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = status_response(status);

        if status.is_server_error() {
            response.extensions_mut().insert(ServerFault::capture(&self));
        } else {
            tracing::debug!(error = %self, status_code = %status, "Client error");
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    #[test]
    fn test_not_found_status() {
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Model(ModelError::NoRecord).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_infrastructure_errors_are_server_errors() {
        let error = AppError::Model(ModelError::Pool("timed out".to_string()));
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let error = AppError::TemplateNotFound("missing.html".to_string());
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_server_error_details_stay_out_of_the_body() {
        let error = AppError::Model(ModelError::Pool("sensitive internal detail".to_string()));
        let response = error.into_response();

        let fault = response.extensions().get::<ServerFault>().cloned().unwrap();
        assert!(fault.message.contains("sensitive internal detail"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Internal Server Error");
    }

    #[test]
    fn test_client_errors_carry_no_fault() {
        let response = AppError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<ServerFault>().is_none());
    }

    #[test]
    fn test_panic_becomes_closing_server_error() {
        let response = recover_panic(Box::new("index out of bounds"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CONNECTION], "close");

        let fault = response.extensions().get::<ServerFault>().unwrap();
        assert!(fault.message.contains("index out of bounds"));
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let error = AppError::Template {
            page: "home.html".to_string(),
            source: minijinja::Error::new(minijinja::ErrorKind::UndefinedError, "boom"),
        };
        let chain = error_chain(&error);
        assert!(chain.starts_with("failed to render template home.html: "));
        assert!(chain.contains("boom"));
    }
}
