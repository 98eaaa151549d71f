//! SQLite-backed [`CaseStore`] and [`VectorStore`].
//!
//! Cases live in the `cases` table with their JSON-valued fields stored as
//! text; embeddings live in `embeddings` with the vector encoded as a
//! little-endian `f32` BLOB. Timestamps are fixed-width RFC 3339 strings so
//! that text ordering is chronological.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use osint_harness_core::embedding::{blob_to_vec, vec_to_blob};
use osint_harness_core::models::{Case, CaseFilter, CaseMetadata, EmbeddingRecord};
use osint_harness_core::store::{CaseStore, VectorStore};
use osint_harness_core::{Error, Result};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn unavailable(e: impl std::fmt::Display) -> Error {
    Error::StoreUnavailable(e.to_string())
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| unavailable(format!("bad timestamp '{}': {}", raw, e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(unavailable)
}

fn from_json<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).map_err(unavailable)
}

fn case_from_row(row: &SqliteRow) -> Result<Case> {
    let query_type: String = row.get("query_type");
    let risk_level: String = row.get("risk_level");
    let tags_json: String = row.get("tags_json");
    let results_json: String = row.get("results_json");
    let analysis_json: String = row.get("analysis_json");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Case {
        id: row.get("id"),
        title: row.get("title"),
        query: row.get("query"),
        query_type: query_type.parse().map_err(unavailable)?,
        date: row.get("date"),
        risk_level: risk_level.parse().map_err(unavailable)?,
        summary: row.get("summary"),
        notes: row.get("notes"),
        tags: from_json(&tags_json)?,
        results: from_json(&results_json)?,
        analysis: from_json(&analysis_json)?,
        user_id: row.get("user_id"),
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn record_from_row(row: &SqliteRow) -> Result<EmbeddingRecord> {
    let blob: Vec<u8> = row.get("vector");
    let metadata_json: String = row.get("metadata_json");
    let created_at: String = row.get("created_at");

    Ok(EmbeddingRecord {
        id: row.get("id"),
        case_id: row.get("case_id"),
        vector: blob_to_vec(&blob),
        metadata: from_json::<CaseMetadata>(&metadata_json)?,
        content_hash: row.get("content_hash"),
        model: row.get("model"),
        created_at: parse_ts(&created_at)?,
    })
}

const CASE_COLUMNS: &str = "id, title, query, query_type, date, risk_level, summary, notes, \
     tags_json, results_json, analysis_json, user_id, created_at, updated_at";

const EMBEDDING_COLUMNS: &str =
    "id, case_id, vector, dims, model, content_hash, metadata_json, created_at";

#[async_trait]
impl CaseStore for SqliteStore {
    async fn put_case(&self, case: &Case) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cases (id, title, query, query_type, date, risk_level, summary, notes,
                               tags_json, results_json, analysis_json, user_id,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                query = excluded.query,
                query_type = excluded.query_type,
                date = excluded.date,
                risk_level = excluded.risk_level,
                summary = excluded.summary,
                notes = excluded.notes,
                tags_json = excluded.tags_json,
                results_json = excluded.results_json,
                analysis_json = excluded.analysis_json,
                user_id = excluded.user_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&case.id)
        .bind(&case.title)
        .bind(&case.query)
        .bind(case.query_type.as_str())
        .bind(&case.date)
        .bind(case.risk_level.as_str())
        .bind(&case.summary)
        .bind(&case.notes)
        .bind(to_json(&case.tags)?)
        .bind(to_json(&case.results)?)
        .bind(to_json(&case.analysis)?)
        .bind(&case.user_id)
        .bind(format_ts(&case.created_at))
        .bind(format_ts(&case.updated_at))
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn get_case(&self, id: &str) -> Result<Option<Case>> {
        let row = sqlx::query(&format!("SELECT {} FROM cases WHERE id = ?", CASE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        row.as_ref().map(case_from_row).transpose()
    }

    async fn query_cases(&self, filter: &CaseFilter) -> Result<Vec<Case>> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = filter.limit.map_or(-1, |l| l as i64);
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM cases
            WHERE (?1 IS NULL OR risk_level = ?1)
              AND (?2 IS NULL OR query_type = ?2)
              AND (?3 IS NULL OR user_id = ?3)
            ORDER BY created_at DESC, id ASC
            LIMIT ?4
            "#,
            CASE_COLUMNS
        ))
        .bind(filter.risk_level.map(|r| r.as_str()))
        .bind(filter.query_type.map(|t| t.as_str()))
        .bind(filter.user_id.as_deref())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.iter().map(case_from_row).collect()
    }

    async fn delete_case(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cases WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn put_embedding(&self, record: &EmbeddingRecord) -> Result<()> {
        // REPLACE also evicts an older record for the same case.
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO embeddings
                (id, case_id, vector, dims, model, content_hash, metadata_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.case_id)
        .bind(vec_to_blob(&record.vector))
        .bind(record.vector.len() as i64)
        .bind(&record.model)
        .bind(&record.content_hash)
        .bind(to_json(&record.metadata)?)
        .bind(format_ts(&record.created_at))
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        Ok(())
    }

    async fn get_embedding(&self, id: &str) -> Result<Option<EmbeddingRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM embeddings WHERE id = ?",
            EMBEDDING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn get_embedding_by_case(&self, case_id: &str) -> Result<Option<EmbeddingRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM embeddings WHERE case_id = ?",
            EMBEDDING_COLUMNS
        ))
        .bind(case_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn scan_embeddings(&self) -> Result<Vec<EmbeddingRecord>> {
        // A single SELECT reads from one snapshot.
        let rows = sqlx::query(&format!("SELECT {} FROM embeddings", EMBEDDING_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        rows.iter().map(record_from_row).collect()
    }

    async fn delete_embeddings_for_case(&self, case_id: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM embeddings WHERE case_id = ?")
            .bind(case_id)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(result.rows_affected() as usize)
    }
}
