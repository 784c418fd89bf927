mod kv;
mod models;
mod site;

pub use kv::*;
pub use models::*;
pub use site::SiteConfigRepository;

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    // Comment lines go first; they may contain `;`
    let cleaned: String = sql
        .lines()
        .filter(|line| !line.trim().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    for statement in cleaned.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

    let db_path = data_dir.join("gatehouse.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    // One writer, one reader: the same process.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&db_url)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

/// Open a throwaway database that lives as long as the pool.
pub async fn init_in_memory() -> Result<DbPool> {
    // A second connection would see a different empty database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;

    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: key-value state
    let has_kv_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='kv_store'",
    )
    .fetch_optional(pool)
    .await?;
    if has_kv_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/001_kv_store.sql")).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("data");
        let pool = init(&data_dir).await.unwrap();

        assert!(data_dir.join("gatehouse.db").exists());

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM kv_store")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn test_execute_sql_ignores_semicolons_in_comments() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let sql = "-- first; second\nCREATE TABLE a (x TEXT);\n-- trailing; note\nCREATE TABLE b (y TEXT);\n";
        execute_sql(&pool, sql).await.unwrap();

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(tables, vec![("a".to_string(),), ("b".to_string(),)]);
    }

    #[tokio::test]
    async fn test_bundled_migration_applies() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        execute_sql(&pool, include_str!("../../migrations/001_kv_store.sql"))
            .await
            .unwrap();
        sqlx::query("INSERT INTO kv_store (key, value) VALUES ('adminFlag', 'true')")
            .execute(&pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = init_in_memory().await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_reopen_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let pool = init(dir.path()).await.unwrap();
            let store = SqliteStore::new(pool.clone());
            store.set(keys::ANNOUNCEMENT, "\"hello\"").await.unwrap();
            pool.close().await;
        }
        let pool = init(dir.path()).await.unwrap();
        let store = SqliteStore::new(pool);
        assert_eq!(
            store.get(keys::ANNOUNCEMENT).await.unwrap().as_deref(),
            Some("\"hello\"")
        );
    }
}
