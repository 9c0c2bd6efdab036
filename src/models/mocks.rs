//! In-memory repositories for handler tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::async_trait;
use chrono::{Duration, TimeZone, Utc};

use super::{ModelError, ModelResult, Snippet, SnippetRepository, User, UserRepository};

pub const MOCK_EMAIL: &str = "bob@example.com";
pub const MOCK_PASSWORD: &str = "validPa$$word";
pub const DUPLICATE_EMAIL: &str = "dupe@example.com";

pub fn mock_snippet() -> Snippet {
    let created = Utc.with_ymd_and_hms(2025, 3, 17, 10, 15, 21).unwrap();
    Snippet {
        id: 1,
        title: "An old silent pond".to_string(),
        content: "An old silent pond...".to_string(),
        created,
        expires: created + Duration::days(365),
    }
}

#[derive(Debug, Default)]
pub struct MockSnippetRepository {
    pub get_calls: AtomicUsize,
    pub insert_calls: AtomicUsize,
    pub inserted_title: Mutex<Option<String>>,
}

#[async_trait]
impl SnippetRepository for MockSnippetRepository {
    async fn insert(&self, title: &str, _content: &str, _expires_days: i32) -> ModelResult<i32> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        *self.inserted_title.lock().unwrap() = Some(title.to_string());
        Ok(2)
    }

    async fn get(&self, id: i32) -> ModelResult<Snippet> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        match id {
            1 => Ok(mock_snippet()),
            _ => Err(ModelError::NoRecord),
        }
    }

    async fn latest(&self) -> ModelResult<Vec<Snippet>> {
        Ok(vec![mock_snippet()])
    }
}

#[derive(Debug, Default)]
pub struct MockUserRepository {
    pub insert_calls: AtomicUsize,
    pub password_update_calls: AtomicUsize,
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn insert(&self, _name: &str, email: &str, _password: &str) -> ModelResult<()> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        match email {
            DUPLICATE_EMAIL => Err(ModelError::DuplicateEmail),
            _ => Ok(()),
        }
    }

    async fn authenticate(&self, email: &str, password: &str) -> ModelResult<i32> {
        if email == MOCK_EMAIL && password == MOCK_PASSWORD {
            Ok(1)
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: i32) -> ModelResult<bool> {
        Ok(id == 1)
    }

    async fn get(&self, id: i32) -> ModelResult<User> {
        match id {
            1 => Ok(User {
                id: 1,
                name: "Bob".to_string(),
                email: MOCK_EMAIL.to_string(),
                hashed_password: String::new(),
                created: Utc.with_ymd_and_hms(2025, 3, 17, 10, 15, 21).unwrap(),
            }),
            _ => Err(ModelError::NoRecord),
        }
    }

    async fn password_update(
        &self,
        id: i32,
        current_password: &str,
        _new_password: &str,
    ) -> ModelResult<()> {
        self.password_update_calls.fetch_add(1, Ordering::SeqCst);
        match (id, current_password) {
            (1, MOCK_PASSWORD) => Ok(()),
            (1, _) => Err(ModelError::InvalidCredentials),
            _ => Err(ModelError::NoRecord),
        }
    }
}
