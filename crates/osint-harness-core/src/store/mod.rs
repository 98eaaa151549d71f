//! Storage abstraction for OSINT Harness.
//!
//! Two collaborator traits cover everything the case lifecycle and the
//! similarity engine need from persistence:
//!
//! | Trait | Holds | Used by |
//! |-------|-------|---------|
//! | [`CaseStore`] | authoritative case documents | case service, HTTP API |
//! | [`VectorStore`] | derived embedding records | similarity engine |
//!
//! Implementations must be `Send + Sync` to work with async runtimes and
//! report backend failures as [`Error::StoreUnavailable`](crate::Error::StoreUnavailable).
//! [`VectorStore::scan_embeddings`] must return a consistent snapshot; the
//! engine does not guard against torn reads itself.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Case, CaseFilter, EmbeddingRecord};

/// Document store for cases.
#[async_trait]
pub trait CaseStore: Send + Sync {
    /// Insert or replace a case by id.
    async fn put_case(&self, case: &Case) -> Result<()>;

    async fn get_case(&self, id: &str) -> Result<Option<Case>>;

    /// List cases matching `filter`, newest first.
    async fn query_cases(&self, filter: &CaseFilter) -> Result<Vec<Case>>;

    /// Delete a case. Returns `false` if it did not exist.
    async fn delete_case(&self, id: &str) -> Result<bool>;
}

/// Store of case embeddings.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace an embedding record by id.
    async fn put_embedding(&self, record: &EmbeddingRecord) -> Result<()>;

    async fn get_embedding(&self, id: &str) -> Result<Option<EmbeddingRecord>>;

    async fn get_embedding_by_case(&self, case_id: &str) -> Result<Option<EmbeddingRecord>>;

    /// Return every stored record.
    async fn scan_embeddings(&self) -> Result<Vec<EmbeddingRecord>>;

    /// Remove all records owned by a case, returning how many were removed.
    async fn delete_embeddings_for_case(&self, case_id: &str) -> Result<usize>;
}
