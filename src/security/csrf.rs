//! Synchronizer-token CSRF check for form posts.
//!
//! Each session carries one random token. Pages render it into a hidden
//! `csrf_token` field and every state-changing request must echo it back.

use axum::{
    body::{Body, to_bytes},
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use rand_core::{OsRng, RngCore};

use crate::errors::{AppError, status_response};
use crate::logging::SecurityEvent;
use crate::security::form::MAX_BODY_SIZE_BYTES;
use crate::session::{CSRF_TOKEN, Session, SessionError};

pub const CSRF_FIELD: &str = "csrf_token";

const TOKEN_BYTES: usize = 32;

/// The session's token, issuing one on first use.
pub async fn session_token(session: &Session) -> Result<String, SessionError> {
    if let Some(token) = session.get_string(CSRF_TOKEN).await? {
        return Ok(token);
    }

    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let token = hex::encode(bytes);
    session.put(CSRF_TOKEN, &token).await?;
    Ok(token)
}

fn is_safe(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE].contains(method)
}

/// Length check first, then every byte, so timing does not reveal a prefix.
fn tokens_match(expected: &str, submitted: &str) -> bool {
    expected.len() == submitted.len()
        && expected
            .bytes()
            .zip(submitted.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}

fn submitted_token(body: &[u8]) -> Option<String> {
    form_urlencoded::parse(body)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned())
}

/// Rejects unsafe requests whose body does not carry the session's token.
/// The body is buffered and handed on unchanged.
pub async fn verify_csrf(
    session: Session,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = session_token(&session).await?;

    if is_safe(request.method()) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let Ok(bytes) = to_bytes(body, MAX_BODY_SIZE_BYTES).await else {
        return Ok(status_response(StatusCode::BAD_REQUEST));
    };

    let matched = submitted_token(&bytes).is_some_and(|token| tokens_match(&expected, &token));
    if !matched {
        crate::log_security_event!(
            SecurityEvent::CsrfRejected,
            method = %parts.method,
            path = %parts.uri.path(),
            "Form post without a valid CSRF token"
        );
        return Ok(status_response(StatusCode::BAD_REQUEST));
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc123", "abc123"));
        assert!(!tokens_match("abc123", "abc124"));
        assert!(!tokens_match("abc123", "abc12"));
        assert!(!tokens_match("abc123", ""));
    }

    #[test]
    fn test_submitted_token_is_read_from_the_form() {
        assert_eq!(
            submitted_token(b"title=x&csrf_token=f00d&expires=7").as_deref(),
            Some("f00d")
        );
        assert_eq!(submitted_token(b"title=x"), None);
    }

    #[test]
    fn test_only_reads_are_safe() {
        assert!(is_safe(&Method::GET));
        assert!(is_safe(&Method::HEAD));
        assert!(!is_safe(&Method::POST));
        assert!(!is_safe(&Method::DELETE));
    }
}
