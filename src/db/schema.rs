//! Table catalogue and schema lifecycle.
//!
//! The DDL lives in `migrations/`; this module knows the table names and the
//! order they must be dropped in, and applies the embedded migration.

use super::error::StoreResult;
use super::repo::Pool;
use sqlx::migrate::Migrator;
use tracing::{debug, instrument};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Bookkeeping table written by `sqlx::migrate`.
const MIGRATIONS_TABLE: &str = "_sqlx_migrations";

/// Every table of the schema, parents before children.
pub const TABLES: [&str; 6] = [
    "department",
    "customer",
    "course",
    "vacancy",
    "news",
    "reception",
];

/// Create any missing tables. Non-destructive, safe to call on every start.
#[instrument(skip_all)]
pub async fn apply(pool: &Pool) -> StoreResult<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// Drop every table of the schema, children first, plus the migration log so
/// a following [`apply`] recreates everything from scratch.
#[instrument(skip_all)]
pub async fn drop_all(pool: &Pool) -> StoreResult<()> {
    for table in TABLES.iter().rev().chain(std::iter::once(&MIGRATIONS_TABLE)) {
        debug!(table, "dropping table");
        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Names of the user tables currently present, sorted.
pub async fn existing_tables(pool: &Pool) -> StoreResult<Vec<String>> {
    let names = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != ? ORDER BY name",
    )
    .bind(MIGRATIONS_TABLE)
    .fetch_all(pool)
    .await?;
    Ok(names)
}
