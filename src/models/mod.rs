pub mod snippet;
pub mod user;

#[cfg(test)]
pub mod mocks;

use axum::async_trait;
use diesel::result::Error as DieselError;
use thiserror::Error;

pub use snippet::{PgSnippetRepository, Snippet};
pub use user::{PgUserRepository, User};

/// Outcomes a repository call can report.
///
/// `NoRecord`, `InvalidCredentials` and `DuplicateEmail` are expected domain
/// conditions that handlers branch on; the remaining variants are
/// infrastructure faults.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no matching record found")]
    NoRecord,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("duplicate email")]
    DuplicateEmail,
    #[error("database error")]
    Database(#[source] DieselError),
    #[error("connection pool error: {0}")]
    Pool(String),
    #[error("failed to hash password: {0}")]
    PasswordHashing(String),
    #[error("background task failed: {0}")]
    Task(String),
}

impl From<DieselError> for ModelError {
    fn from(error: DieselError) -> Self {
        match error {
            DieselError::NotFound => ModelError::NoRecord,
            other => ModelError::Database(other),
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;

#[async_trait]
pub trait SnippetRepository: Send + Sync {
    async fn insert(&self, title: &str, content: &str, expires_days: i32) -> ModelResult<i32>;
    /// Returns the snippet only while it has not expired.
    async fn get(&self, id: i32) -> ModelResult<Snippet>;
    /// The ten most recently created snippets that have not expired.
    async fn latest(&self) -> ModelResult<Vec<Snippet>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, name: &str, email: &str, password: &str) -> ModelResult<()>;
    async fn authenticate(&self, email: &str, password: &str) -> ModelResult<i32>;
    async fn exists(&self, id: i32) -> ModelResult<bool>;
    async fn get(&self, id: i32) -> ModelResult<User>;
    async fn password_update(
        &self,
        id: i32,
        current_password: &str,
        new_password: &str,
    ) -> ModelResult<()>;
}
