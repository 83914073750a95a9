use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Number of forward migrations the database has not applied yet.
pub async fn pending_count(pool: &DbPool) -> Result<usize, sqlx::Error> {
    let known = MIGRATOR.iter().filter(|migration| migration.migration_type.is_up_migration());
    let applied: Vec<i64> = match sqlx::query_scalar(
        "SELECT version FROM _sqlx_migrations WHERE success = 1",
    )
    .fetch_all(pool)
    .await
    {
        Ok(versions) => versions,
        Err(sqlx::Error::Database(error)) if error.message().contains("no such table") => {
            Vec::new()
        }
        Err(error) => return Err(error),
    };

    Ok(known.filter(|migration| !applied.contains(&migration.version)).count())
}
