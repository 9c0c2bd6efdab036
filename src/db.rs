use std::time::Duration;

use anyhow::Context;
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::Pool;

pub type PgPool = Pool<AsyncPgConnection>;

const MAX_SIZE: u32 = 16;
const MIN_IDLE: u32 = 4;
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

#[tracing::instrument(name = "database_pool_setup", skip(database_url))]
pub async fn establish_pool(database_url: &str) -> anyhow::Result<PgPool> {
    tracing::debug!("Initializing database connection pool");

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);

    let pool = Pool::builder()
        .max_size(MAX_SIZE)
        .min_idle(Some(MIN_IDLE))
        .connection_timeout(CONNECTION_TIMEOUT)
        .idle_timeout(Some(Duration::from_secs(600)))
        .max_lifetime(Some(Duration::from_secs(3600)))
        .build(manager)
        .await
        .context("failed to create database connection pool")?;

    // Fail at start-up rather than on the first request.
    drop(
        pool.get()
            .await
            .context("failed to connect to the database")?,
    );

    tracing::info!(
        max_size = MAX_SIZE,
        min_idle = MIN_IDLE,
        connection_timeout_secs = CONNECTION_TIMEOUT.as_secs(),
        "Database connection pool established"
    );

    Ok(pool)
}
