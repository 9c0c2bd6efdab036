use std::collections::HashSet;

use axum::{
    async_trait,
    body::to_bytes,
    extract::{FromRequest, Request},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;

use crate::errors::status_response;

pub const MAX_BODY_SIZE_BYTES: usize = 64 * 1024; // 64 KiB upper bound for request bodies

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// URL-encoded form body decoded into `T`.
///
/// Absent fields take their `Default` and a repeated field keeps its first
/// value; fields that do not parse reject the whole request with 400 before
/// the handler runs.
#[derive(Debug)]
pub struct ValidatedForm<T>(pub T);

#[derive(Debug)]
pub struct FormRejection {
    message: String,
}

impl FormRejection {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn parsing_error(err: serde_path_to_error::Error<serde_urlencoded::de::Error>) -> Self {
        let path = err.path().to_string();
        let error = err.into_inner();
        if path.is_empty() || path == "." {
            Self::new(format!("failed to decode form: {error}"))
        } else {
            Self::new(format!("failed to decode form field {path}: {error}"))
        }
    }
}

impl IntoResponse for FormRejection {
    fn into_response(self) -> Response {
        tracing::debug!(reason = %self.message, "Rejected form submission");
        status_response(StatusCode::BAD_REQUEST)
    }
}

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedForm<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = FormRejection;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        validate_content_type(req.headers())?;

        let body_bytes = to_bytes(req.into_body(), MAX_BODY_SIZE_BYTES)
            .await
            .map_err(|err| FormRejection::new(format!("failed to read request body: {err}")))?;

        let body = first_values(&body_bytes);
        let deserializer =
            serde_urlencoded::Deserializer::new(form_urlencoded::parse(body.as_bytes()));
        let value =
            serde_path_to_error::deserialize(deserializer).map_err(FormRejection::parsing_error)?;

        Ok(ValidatedForm(value))
    }
}

/// Re-encodes the body keeping only the first occurrence of each key.
fn first_values(body: &[u8]) -> String {
    let mut seen = HashSet::new();
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(form_urlencoded::parse(body).filter(|(key, _)| seen.insert(key.clone())))
        .finish()
}

/// Integer field where an empty submission counts as zero.
pub fn empty_as_zero<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.trim().is_empty() {
        return Ok(0);
    }
    raw.trim().parse().map_err(de::Error::custom)
}

fn validate_content_type(headers: &HeaderMap) -> Result<(), FormRejection> {
    let value = headers.get(CONTENT_TYPE);

    if let Some(value) = value
        && let Ok(value) = value.to_str()
        && value.starts_with(FORM_CONTENT_TYPE)
    {
        return Ok(());
    }

    let received = value
        .and_then(|val| val.to_str().ok())
        .unwrap_or("missing");
    Err(FormRejection::new(format!(
        "expected {FORM_CONTENT_TYPE} payload, received {received}"
    )))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Sample {
        title: String,
        #[serde(deserialize_with = "empty_as_zero")]
        expires: i32,
    }

    fn request(content_type: Option<&str>, body: &'static str) -> Request {
        let mut builder = Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        builder.body(Body::from(body)).unwrap()
    }

    #[tokio::test]
    async fn test_decodes_fields() {
        let req = request(Some(FORM_CONTENT_TYPE), "title=Hello+world&expires=7&extra=x");
        let ValidatedForm(sample) = ValidatedForm::<Sample>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(sample.title, "Hello world");
        assert_eq!(sample.expires, 7);
    }

    #[tokio::test]
    async fn test_missing_fields_take_defaults() {
        let req = request(Some(FORM_CONTENT_TYPE), "title=only");
        let ValidatedForm(sample) = ValidatedForm::<Sample>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(sample.expires, 0);
    }

    #[tokio::test]
    async fn test_empty_number_is_zero() {
        let req = request(Some(FORM_CONTENT_TYPE), "title=x&expires=");
        let ValidatedForm(sample) = ValidatedForm::<Sample>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(sample.expires, 0);
    }

    #[tokio::test]
    async fn test_repeated_field_keeps_first_value() {
        let req = request(Some(FORM_CONTENT_TYPE), "title=t&title=u&expires=7");
        let ValidatedForm(sample) = ValidatedForm::<Sample>::from_request(req, &())
            .await
            .unwrap();
        assert_eq!(sample.title, "t");
        assert_eq!(sample.expires, 7);
    }

    #[tokio::test]
    async fn test_unparsable_field_is_rejected() {
        let req = request(Some(FORM_CONTENT_TYPE), "title=x&expires=soon");
        let rejection = ValidatedForm::<Sample>::from_request(req, &())
            .await
            .unwrap_err();
        assert!(rejection.message.contains("expires"));
        assert_eq!(rejection.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_rejected() {
        let req = request(Some("application/json"), "{}");
        let rejection = ValidatedForm::<Sample>::from_request(req, &())
            .await
            .unwrap_err();
        assert_eq!(rejection.into_response().status(), StatusCode::BAD_REQUEST);

        let req = request(None, "title=x");
        assert!(
            ValidatedForm::<Sample>::from_request(req, &())
                .await
                .is_err()
        );
    }
}
