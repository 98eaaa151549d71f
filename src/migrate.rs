use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the database file and schema (`osint init`).
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Idempotent schema setup.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Create cases table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cases (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            query TEXT NOT NULL,
            query_type TEXT NOT NULL,
            date TEXT NOT NULL,
            risk_level TEXT NOT NULL,
            summary TEXT NOT NULL DEFAULT '',
            notes TEXT,
            tags_json TEXT NOT NULL DEFAULT '[]',
            results_json TEXT NOT NULL DEFAULT 'null',
            analysis_json TEXT NOT NULL DEFAULT 'null',
            user_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create embeddings table, one record per case
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS embeddings (
            id TEXT PRIMARY KEY,
            case_id TEXT NOT NULL UNIQUE,
            vector BLOB NOT NULL,
            dims INTEGER NOT NULL,
            model TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            metadata_json TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cases_created_at ON cases(created_at DESC)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cases_user_id ON cases(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}
