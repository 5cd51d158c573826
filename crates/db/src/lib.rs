//! Postgres persistence for centers, operators, bug reports and settings.

pub mod models;
pub mod repositories;

use futures::future::BoxFuture;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgConnection;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify connectivity.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply all pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}

/// Run `f` inside a single transaction.
///
/// The closure receives the transaction's connection. Repository methods take
/// `&mut PgConnection` (or any executor), so everything `f` calls with that
/// connection joins the same transaction; commit or rollback happens only
/// here, based on the closure's result.
///
/// ```ignore
/// use_transaction(&pool, move |conn| Box::pin(async move {
///     CenterRepo::delete_by_operator(&mut *conn, operator).await?;
///     Ok::<_, sqlx::Error>(())
/// })).await?;
/// ```
pub async fn use_transaction<T, E, F>(pool: &DbPool, f: F) -> Result<T, E>
where
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, E>>,
    E: From<sqlx::Error>,
{
    let mut tx = pool.begin().await?;
    match f(&mut *tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                tracing::error!(error = %rollback, "Transaction rollback failed");
            }
            Err(e)
        }
    }
}
