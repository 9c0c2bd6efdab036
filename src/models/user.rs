use axum::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::db::PgPool;
use crate::schema::users;
use crate::security::password::{hash_password, verify_password};

use super::{ModelError, ModelResult, UserRepository};

const EMAIL_UNIQUE_CONSTRAINT: &str = "users_uc_email";

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
struct NewUser<'a> {
    name: &'a str,
    email: &'a str,
    hashed_password: &'a str,
    created: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_insert_error(error: DieselError) -> ModelError {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
            if info.constraint_name() == Some(EMAIL_UNIQUE_CONSTRAINT) =>
        {
            ModelError::DuplicateEmail
        }
        other => ModelError::from(other),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[tracing::instrument(name = "user_insert", skip_all)]
    async fn insert(&self, name: &str, email: &str, password: &str) -> ModelResult<()> {
        let hashed_password = hash_password(password.to_string()).await?;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| ModelError::Pool(err.to_string()))?;

        diesel::insert_into(users::table)
            .values(&NewUser {
                name,
                email,
                hashed_password: &hashed_password,
                created: Utc::now(),
            })
            .execute(&mut conn)
            .await
            .map_err(map_insert_error)?;

        Ok(())
    }

    #[tracing::instrument(name = "user_authenticate", skip_all)]
    async fn authenticate(&self, email: &str, password: &str) -> ModelResult<i32> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| ModelError::Pool(err.to_string()))?;

        let (id, hashed_password) = users::table
            .filter(users::email.eq(email))
            .select((users::id, users::hashed_password))
            .first::<(i32, String)>(&mut conn)
            .await
            .map_err(|err| match err {
                DieselError::NotFound => ModelError::InvalidCredentials,
                other => ModelError::Database(other),
            })?;
        drop(conn);

        if verify_password(password.to_string(), hashed_password).await? {
            Ok(id)
        } else {
            Err(ModelError::InvalidCredentials)
        }
    }

    async fn exists(&self, id: i32) -> ModelResult<bool> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| ModelError::Pool(err.to_string()))?;

        let found = diesel::select(diesel::dsl::exists(users::table.filter(users::id.eq(id))))
            .get_result::<bool>(&mut conn)
            .await?;

        Ok(found)
    }

    async fn get(&self, id: i32) -> ModelResult<User> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| ModelError::Pool(err.to_string()))?;

        let user = users::table
            .find(id)
            .select(User::as_select())
            .first(&mut conn)
            .await?;

        Ok(user)
    }

    #[tracing::instrument(
        name = "user_password_update",
        skip(self, current_password, new_password)
    )]
    async fn password_update(
        &self,
        id: i32,
        current_password: &str,
        new_password: &str,
    ) -> ModelResult<()> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| ModelError::Pool(err.to_string()))?;

        let stored_hash = users::table
            .find(id)
            .select(users::hashed_password)
            .first::<String>(&mut conn)
            .await?;
        // Not held across the Argon2 work.
        drop(conn);

        if !verify_password(current_password.to_string(), stored_hash).await? {
            return Err(ModelError::InvalidCredentials);
        }

        let new_hash = hash_password(new_password.to_string()).await?;

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| ModelError::Pool(err.to_string()))?;

        let updated = diesel::update(users::table.find(id))
            .set(users::hashed_password.eq(new_hash))
            .execute(&mut conn)
            .await?;
        if updated == 0 {
            return Err(ModelError::NoRecord);
        }

        Ok(())
    }
}
