//! Cookie-keyed server-side sessions on top of `tower-sessions`.
//!
//! [`session_layer`] installs the session manager for dynamic routes; the
//! [`Session`] extractor wraps its per-request handle with the typed accessors
//! the handlers use. Renewing the token moves the record to a fresh id and
//! deletes the old one, so an id issued before login is useless after it.

pub mod postgres;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinHandle;
use tower_sessions::cookie::SameSite;
use tower_sessions::session_store::{ExpiredDeletion, SessionStore};
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::errors::AppError;

pub use postgres::PgSessionStore;

pub const FLASH: &str = "flash";
pub const AUTHENTICATED_USER_ID: &str = "authenticatedUserID";
pub const ORIGINAL_PATH: &str = "originalPath";
pub const CSRF_TOKEN: &str = "csrfToken";

pub const COOKIE_NAME: &str = "session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session middleware is not installed for this route")]
    MissingLayer,
    #[error("session store error")]
    Store(#[from] tower_sessions::session::Error),
}

/// Per-request handle to the current browser session.
#[derive(Debug, Clone)]
pub struct Session(tower_sessions::Session);

impl Session {
    pub async fn put(&self, key: &str, value: impl Serialize + Send) -> Result<(), SessionError> {
        self.0.insert(key, value).await?;
        Ok(())
    }

    pub async fn get_string(&self, key: &str) -> Result<Option<String>, SessionError> {
        let value = self.0.get_value(key).await?;
        Ok(value.as_ref().and_then(Value::as_str).map(str::to_string))
    }

    /// Zero when the key is absent or not an integer.
    pub async fn get_int(&self, key: &str) -> Result<i32, SessionError> {
        let value = self.0.get_value(key).await?;
        Ok(value
            .as_ref()
            .and_then(Value::as_i64)
            .and_then(|value| i32::try_from(value).ok())
            .unwrap_or(0))
    }

    /// Reads a string and removes the key.
    pub async fn pop_string(&self, key: &str) -> Result<Option<String>, SessionError> {
        let value = self.0.remove_value(key).await?;
        Ok(value.as_ref().and_then(Value::as_str).map(str::to_string))
    }

    pub async fn remove(&self, key: &str) -> Result<(), SessionError> {
        self.0.remove_value(key).await?;
        Ok(())
    }

    /// Moves the session data to a new id and drops the old record.
    pub async fn renew_token(&self) -> Result<(), SessionError> {
        self.0.cycle_id().await?;
        Ok(())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<tower_sessions::Session>()
            .cloned()
            .map(Session)
            .ok_or(AppError::Session(SessionError::MissingLayer))
    }
}

/// Session cookie settings: `HttpOnly`, `SameSite=Lax`, sliding expiry of
/// `lifetime` since the last request.
pub fn session_layer<Store>(
    store: Store,
    lifetime: time::Duration,
    secure: bool,
) -> SessionManagerLayer<Store>
where
    Store: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(COOKIE_NAME)
        .with_path("/")
        .with_http_only(true)
        .with_same_site(SameSite::Lax)
        .with_secure(secure)
        .with_expiry(Expiry::OnInactivity(lifetime))
}

/// Periodically purges expired records from the store.
pub fn spawn_cleanup<Store>(store: Store, period: std::time::Duration) -> JoinHandle<()>
where
    Store: ExpiredDeletion + Clone,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match store.delete_expired().await {
                Ok(()) => tracing::debug!("Expired sessions purged"),
                Err(err) => tracing::warn!(error = %err, "Failed to purge expired sessions"),
            }
        }
    })
}
