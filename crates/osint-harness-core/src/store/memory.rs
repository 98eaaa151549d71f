//! In-memory [`CaseStore`] and [`VectorStore`] for testing and WASM targets.
//!
//! Uses `HashMap` behind `std::sync::RwLock`. A scan clones the records
//! under one read lock, which gives callers a consistent snapshot.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{Case, CaseFilter, EmbeddingRecord};

use super::{CaseStore, VectorStore};

/// In-memory store for testing and WASM environments.
pub struct InMemoryStore {
    cases: RwLock<HashMap<String, Case>>,
    embeddings: RwLock<HashMap<String, EmbeddingRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            cases: RwLock::new(HashMap::new()),
            embeddings: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| Error::StoreUnavailable("in-memory store lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| Error::StoreUnavailable("in-memory store lock poisoned".to_string()))
}

#[async_trait]
impl CaseStore for InMemoryStore {
    async fn put_case(&self, case: &Case) -> Result<()> {
        write(&self.cases)?.insert(case.id.clone(), case.clone());
        Ok(())
    }

    async fn get_case(&self, id: &str) -> Result<Option<Case>> {
        Ok(read(&self.cases)?.get(id).cloned())
    }

    async fn query_cases(&self, filter: &CaseFilter) -> Result<Vec<Case>> {
        let mut cases: Vec<Case> = read(&self.cases)?
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        cases.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = filter.limit {
            cases.truncate(limit);
        }
        Ok(cases)
    }

    async fn delete_case(&self, id: &str) -> Result<bool> {
        Ok(write(&self.cases)?.remove(id).is_some())
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn put_embedding(&self, record: &EmbeddingRecord) -> Result<()> {
        write(&self.embeddings)?.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_embedding(&self, id: &str) -> Result<Option<EmbeddingRecord>> {
        Ok(read(&self.embeddings)?.get(id).cloned())
    }

    async fn get_embedding_by_case(&self, case_id: &str) -> Result<Option<EmbeddingRecord>> {
        Ok(read(&self.embeddings)?
            .values()
            .find(|r| r.case_id == case_id)
            .cloned())
    }

    async fn scan_embeddings(&self) -> Result<Vec<EmbeddingRecord>> {
        Ok(read(&self.embeddings)?.values().cloned().collect())
    }

    async fn delete_embeddings_for_case(&self, case_id: &str) -> Result<usize> {
        let mut embeddings = write(&self.embeddings)?;
        let before = embeddings.len();
        embeddings.retain(|_, r| r.case_id != case_id);
        Ok(before - embeddings.len())
    }
}
