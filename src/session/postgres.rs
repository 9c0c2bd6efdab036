use std::fmt;

use axum::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::pooled_connection::bb8::PooledConnection;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, ExpiredDeletion, SessionStore};

use crate::db::PgPool;
use crate::schema::sessions;

/// Session records kept in the `sessions` table as JSONB, keyed by the
/// encoded session id.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn connection(&self) -> session_store::Result<PooledConnection<'_, AsyncPgConnection>> {
        self.pool.get().await.map_err(backend)
    }
}

impl fmt::Debug for PgSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgSessionStore").finish_non_exhaustive()
    }
}

fn backend(err: impl fmt::Display) -> session_store::Error {
    session_store::Error::Backend(err.to_string())
}

fn to_chrono(at: OffsetDateTime) -> session_store::Result<DateTime<Utc>> {
    DateTime::from_timestamp(at.unix_timestamp(), at.nanosecond())
        .ok_or_else(|| session_store::Error::Encode(format!("expiry out of range: {at}")))
}

fn to_offset(at: DateTime<Utc>) -> session_store::Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(at.timestamp())
        .map_err(|err| session_store::Error::Decode(err.to_string()))
}

#[async_trait]
impl SessionStore for PgSessionStore {
    /// Inserts under a fresh id, drawing again on the unlikely collision.
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        let data = serde_json::to_value(&record.data)
            .map_err(|err| session_store::Error::Encode(err.to_string()))?;
        let expiry = to_chrono(record.expiry_date)?;
        let mut conn = self.connection().await?;

        loop {
            let inserted = diesel::insert_into(sessions::table)
                .values((
                    sessions::token.eq(record.id.to_string()),
                    sessions::data.eq(&data),
                    sessions::expiry.eq(expiry),
                ))
                .on_conflict_do_nothing()
                .execute(&mut conn)
                .await
                .map_err(backend)?;

            if inserted == 1 {
                return Ok(());
            }
            record.id = Id::default();
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let data = serde_json::to_value(&record.data)
            .map_err(|err| session_store::Error::Encode(err.to_string()))?;
        let expiry = to_chrono(record.expiry_date)?;
        let mut conn = self.connection().await?;

        diesel::insert_into(sessions::table)
            .values((
                sessions::token.eq(record.id.to_string()),
                sessions::data.eq(&data),
                sessions::expiry.eq(expiry),
            ))
            .on_conflict(sessions::token)
            .do_update()
            .set((
                sessions::data.eq(excluded(sessions::data)),
                sessions::expiry.eq(excluded(sessions::expiry)),
            ))
            .execute(&mut conn)
            .await
            .map_err(backend)?;

        Ok(())
    }

    /// Expired records read as absent even before the cleanup task runs.
    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        let mut conn = self.connection().await?;

        let row = sessions::table
            .filter(sessions::token.eq(id.to_string()))
            .filter(sessions::expiry.gt(Utc::now()))
            .select((sessions::data, sessions::expiry))
            .first::<(serde_json::Value, DateTime<Utc>)>(&mut conn)
            .await
            .optional()
            .map_err(backend)?;

        let Some((data, expiry)) = row else {
            return Ok(None);
        };

        Ok(Some(Record {
            id: *id,
            data: serde_json::from_value(data)
                .map_err(|err| session_store::Error::Decode(err.to_string()))?,
            expiry_date: to_offset(expiry)?,
        }))
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        let mut conn = self.connection().await?;

        diesel::delete(sessions::table.filter(sessions::token.eq(id.to_string())))
            .execute(&mut conn)
            .await
            .map_err(backend)?;

        Ok(())
    }
}

#[async_trait]
impl ExpiredDeletion for PgSessionStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        let mut conn = self.connection().await?;

        let removed = diesel::delete(sessions::table.filter(sessions::expiry.lt(Utc::now())))
            .execute(&mut conn)
            .await
            .map_err(backend)?;
        if removed > 0 {
            tracing::debug!(removed, "Expired session records deleted");
        }

        Ok(())
    }
}
