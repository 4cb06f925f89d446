//! Database module: relational storage for users, items and roles.
//!
//! Layout:
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `models.rs`: Rust structs mirroring DB rows
//! - `patch.rs`: write payloads accepted by the actor
//! - `actor.rs`: the actor owning the pool, plus its cloneable handle
//! - `migrate.rs`: user-authored SQL migrations

pub mod actor;
pub mod migrate;
pub mod models;
pub mod patch;
pub mod schema;

pub use actor::{DbActorHandle, spawn};
pub use models::{DbItem, DbRole, DbUser, UserRecord};
pub use patch::{NewItem, NewUser, UserPatch};
pub use schema::SQLITE_INIT;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::{str::FromStr, time::Duration};

/// Open (creating if needed) a SQLite pool with foreign keys enforced.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5))
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    SqlitePoolOptions::new().connect_with(connect_opts).await
}

/// Apply the base schema. Every statement is idempotent.
pub async fn apply_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for stmt in SQLITE_INIT.split(';') {
        let s = stmt.trim();
        if s.is_empty() {
            continue;
        }
        sqlx::query(s).execute(pool).await?;
    }

    for (table, column, decl) in LATE_COLUMNS {
        let present: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
                .bind(*table)
                .bind(*column)
                .fetch_one(pool)
                .await?;
        if present == 0 {
            sqlx::query(&format!("ALTER TABLE {table} ADD COLUMN {column} {decl}"))
                .execute(pool)
                .await?;
        }
    }
    Ok(())
}

/// Columns newer than the tables that may already exist on disk.
const LATE_COLUMNS: &[(&str, &str, &str)] = &[("users", "oauth_linked_at", "TEXT NULL")];
