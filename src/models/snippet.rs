use axum::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::db::PgPool;
use crate::schema::snippets;

use super::{ModelError, ModelResult, SnippetRepository};

const LATEST_LIMIT: i64 = 10;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = snippets)]
pub struct Snippet {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = snippets)]
struct NewSnippet<'a> {
    title: &'a str,
    content: &'a str,
    created: DateTime<Utc>,
    expires: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PgSnippetRepository {
    pool: PgPool,
}

impl PgSnippetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnippetRepository for PgSnippetRepository {
    #[tracing::instrument(name = "snippet_insert", skip(self, title, content))]
    async fn insert(&self, title: &str, content: &str, expires_days: i32) -> ModelResult<i32> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| ModelError::Pool(err.to_string()))?;

        let created = Utc::now();
        let new_snippet = NewSnippet {
            title,
            content,
            created,
            expires: created + Duration::days(i64::from(expires_days)),
        };

        let id = diesel::insert_into(snippets::table)
            .values(&new_snippet)
            .returning(snippets::id)
            .get_result::<i32>(&mut conn)
            .await?;

        tracing::debug!(snippet_id = id, "Snippet stored");
        Ok(id)
    }

    async fn get(&self, id: i32) -> ModelResult<Snippet> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| ModelError::Pool(err.to_string()))?;

        let snippet = snippets::table
            .filter(snippets::id.eq(id))
            .filter(snippets::expires.gt(Utc::now()))
            .select(Snippet::as_select())
            .first(&mut conn)
            .await?;

        Ok(snippet)
    }

    async fn latest(&self) -> ModelResult<Vec<Snippet>> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| ModelError::Pool(err.to_string()))?;

        let results = snippets::table
            .filter(snippets::expires.gt(Utc::now()))
            .order(snippets::id.desc())
            .limit(LATEST_LIMIT)
            .select(Snippet::as_select())
            .load(&mut conn)
            .await?;

        Ok(results)
    }
}
