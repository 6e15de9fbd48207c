//! Connection pool construction and migration management.

use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Default pool size; the chunk loop is sequential, so a handful of
/// connections is plenty.
const MAX_CONNECTIONS: u32 = 5;

/// Build a connection pool from a database URL.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
}

/// Run database migrations.
///
/// Idempotent: already-applied migrations are skipped. `run` ensures the
/// migrations table exists, verifies checksums, and applies anything
/// pending.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    log::info!("checking database migration state");
    MIGRATOR.run(pool).await?;
    log::info!("database migrations up to date");
    Ok(())
}
